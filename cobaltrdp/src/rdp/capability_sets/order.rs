use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

const ORDER_LENGTH: usize = 84;
const TERMINAL_DESCRIPTOR_SIZE: usize = 16;
pub const ORDER_SUPPORT_SIZE: usize = 32;

/// TS_ORDER_CAPABILITYSET. Drawing orders are not decoded by this client, so
/// only the support array and flags are kept.
#[derive(Debug, PartialEq, Clone)]
pub struct Order {
    pub order_flags: OrderFlags,
    pub order_support: [u8; ORDER_SUPPORT_SIZE],
    pub desktop_save_size: u32,
}

impl Order {
    pub fn no_orders_supported() -> Self {
        Self {
            order_flags: OrderFlags::NEGOTIATE_ORDER_SUPPORT,
            order_support: [0; ORDER_SUPPORT_SIZE],
            desktop_save_size: 0,
        }
    }
}

impl PduParsing for Order {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let mut terminal_descriptor = [0; TERMINAL_DESCRIPTOR_SIZE];
        buffer.read_exact(terminal_descriptor.as_mut())?;
        let _padding = buffer.read_u32::<LittleEndian>()?;
        let _desktop_save_x_granularity = buffer.read_u16::<LittleEndian>()?;
        let _desktop_save_y_granularity = buffer.read_u16::<LittleEndian>()?;
        let _padding = buffer.read_u16::<LittleEndian>()?;
        let _maximum_order_level = buffer.read_u16::<LittleEndian>()?;
        let _number_fonts = buffer.read_u16::<LittleEndian>()?;
        let order_flags = OrderFlags::from_bits_truncate(buffer.read_u16::<LittleEndian>()?);

        let mut order_support = [0; ORDER_SUPPORT_SIZE];
        buffer.read_exact(order_support.as_mut())?;

        let _text_flags = buffer.read_u16::<LittleEndian>()?;
        let _order_support_ex_flags = buffer.read_u16::<LittleEndian>()?;
        let _padding = buffer.read_u32::<LittleEndian>()?;
        let desktop_save_size = buffer.read_u32::<LittleEndian>()?;
        let _padding = buffer.read_u32::<LittleEndian>()?;
        let _text_ansi_code_page = buffer.read_u16::<LittleEndian>()?;
        let _padding = buffer.read_u16::<LittleEndian>()?;

        Ok(Self {
            order_flags,
            order_support,
            desktop_save_size,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_all(&[0; TERMINAL_DESCRIPTOR_SIZE])?; // terminalDescriptor
        buffer.write_u32::<LittleEndian>(0)?; // padding
        buffer.write_u16::<LittleEndian>(1)?; // desktopSaveXGranularity
        buffer.write_u16::<LittleEndian>(20)?; // desktopSaveYGranularity
        buffer.write_u16::<LittleEndian>(0)?; // padding
        buffer.write_u16::<LittleEndian>(1)?; // maximumOrderLevel
        buffer.write_u16::<LittleEndian>(0)?; // numberFonts
        buffer.write_u16::<LittleEndian>(self.order_flags.bits())?;
        buffer.write_all(self.order_support.as_ref())?;
        buffer.write_u16::<LittleEndian>(0)?; // textFlags
        buffer.write_u16::<LittleEndian>(0)?; // orderSupportExFlags
        buffer.write_u32::<LittleEndian>(0)?; // padding
        buffer.write_u32::<LittleEndian>(self.desktop_save_size)?;
        buffer.write_u32::<LittleEndian>(0)?; // padding
        buffer.write_u16::<LittleEndian>(0)?; // textANSICodePage
        buffer.write_u16::<LittleEndian>(0)?; // padding

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        ORDER_LENGTH
    }
}

bitflags! {
    pub struct OrderFlags: u16 {
        const NEGOTIATE_ORDER_SUPPORT = 0x0002;
        const ZERO_BOUNDS_DELTAS_SUPPORT = 0x0008;
        const COLOR_INDEX_SUPPORT = 0x0020;
        const SOLID_PATTERN_BRUSH_ONLY = 0x0040;
        const ORDER_FLAGS_EXTRA_FLAGS = 0x0080;
    }
}
