use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::utils;
use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

const INPUT_LENGTH: usize = 84;
const IME_FILE_NAME_SIZE: usize = 64;

/// TS_INPUT_CAPABILITYSET. The keyboard fields mirror the client core data.
#[derive(Debug, PartialEq, Clone)]
pub struct Input {
    pub input_flags: InputFlags,
    pub keyboard_layout: u32,
    pub keyboard_type: u32,
    pub keyboard_subtype: u32,
    pub keyboard_function_key: u32,
    pub keyboard_ime_filename: String,
}

impl PduParsing for Input {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let input_flags = InputFlags::from_bits_truncate(buffer.read_u16::<LittleEndian>()?);
        let _padding = buffer.read_u16::<LittleEndian>()?;
        let keyboard_layout = buffer.read_u32::<LittleEndian>()?;
        let keyboard_type = buffer.read_u32::<LittleEndian>()?;
        let keyboard_subtype = buffer.read_u32::<LittleEndian>()?;
        let keyboard_function_key = buffer.read_u32::<LittleEndian>()?;

        let mut ime_file_name_buffer = [0; IME_FILE_NAME_SIZE];
        buffer.read_exact(ime_file_name_buffer.as_mut())?;
        let keyboard_ime_filename = utils::bytes_to_utf16_string(ime_file_name_buffer.as_ref())
            .trim_end_matches('\u{0}')
            .into();

        Ok(Self {
            input_flags,
            keyboard_layout,
            keyboard_type,
            keyboard_subtype,
            keyboard_function_key,
            keyboard_ime_filename,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u16::<LittleEndian>(self.input_flags.bits())?;
        buffer.write_u16::<LittleEndian>(0)?; // padding
        buffer.write_u32::<LittleEndian>(self.keyboard_layout)?;
        buffer.write_u32::<LittleEndian>(self.keyboard_type)?;
        buffer.write_u32::<LittleEndian>(self.keyboard_subtype)?;
        buffer.write_u32::<LittleEndian>(self.keyboard_function_key)?;

        let mut ime_file_name = utils::string_to_utf16(self.keyboard_ime_filename.as_str());
        ime_file_name.resize(IME_FILE_NAME_SIZE, 0);
        buffer.write_all(ime_file_name.as_ref())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        INPUT_LENGTH
    }
}

bitflags! {
    pub struct InputFlags: u16 {
        const SCANCODES = 0x0001;
        const MOUSEX = 0x0004;
        const FASTPATH_INPUT = 0x0008;
        const UNICODE = 0x0010;
        const FASTPATH_INPUT_2 = 0x0020;
        const UNUSED_1 = 0x0040;
        const UNUSED_2 = 0x0080;
        const MOUSE_HWHEEL = 0x0100;
        const QOE_TIMESTAMPS = 0x0200;
    }
}
