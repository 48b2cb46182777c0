use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use super::{CoreDataError, RdpVersion, VERSION_SIZE};
use crate::nego::SecurityProtocol;
use crate::utils;
use crate::PduParsing;

pub const IME_FILE_NAME_SIZE: usize = 64;

const CLIENT_NAME_SIZE: usize = 32;
const DIG_PRODUCT_ID_SIZE: usize = 64;

const FIXED_PART_SIZE: usize = VERSION_SIZE
    + 2 // desktopWidth
    + 2 // desktopHeight
    + 2 // colorDepth
    + 2 // SASSequence
    + 4 // keyboardLayout
    + 4 // clientBuild
    + CLIENT_NAME_SIZE
    + 4 // keyboardType
    + 4 // keyboardSubType
    + 4 // keyboardFunctionKey
    + IME_FILE_NAME_SIZE;

/// TS_UD_CS_CORE, required part.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCoreData {
    pub version: RdpVersion,
    pub desktop_width: u16,
    pub desktop_height: u16,
    pub color_depth: ColorDepth,
    pub sec_access_sequence: SecureAccessSequence,
    pub keyboard_layout: u32,
    pub client_build: u32,
    pub client_name: String,
    pub keyboard_type: KeyboardType,
    pub keyboard_subtype: u32,
    pub keyboard_functional_keys_count: u32,
    pub ime_file_name: String,
    pub optional_data: ClientCoreOptionalData,
}

impl PduParsing for ClientCoreData {
    type Error = CoreDataError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let version = RdpVersion(buffer.read_u32::<LittleEndian>()?);
        let desktop_width = buffer.read_u16::<LittleEndian>()?;
        let desktop_height = buffer.read_u16::<LittleEndian>()?;
        let color_depth = ColorDepth::from_u16(buffer.read_u16::<LittleEndian>()?)
            .ok_or(CoreDataError::InvalidColorDepth)?;
        let sec_access_sequence =
            SecureAccessSequence::from_u16(buffer.read_u16::<LittleEndian>()?)
                .ok_or(CoreDataError::InvalidSecureAccessSequence)?;
        let keyboard_layout = buffer.read_u32::<LittleEndian>()?;
        let client_build = buffer.read_u32::<LittleEndian>()?;

        let mut client_name_buffer = [0; CLIENT_NAME_SIZE];
        buffer.read_exact(&mut client_name_buffer)?;
        let client_name = utils::bytes_to_utf16_string(client_name_buffer.as_ref())
            .trim_end_matches('\u{0}')
            .into();

        let keyboard_type = KeyboardType::from_u32(buffer.read_u32::<LittleEndian>()?)
            .ok_or(CoreDataError::InvalidKeyboardType)?;
        let keyboard_subtype = buffer.read_u32::<LittleEndian>()?;
        let keyboard_functional_keys_count = buffer.read_u32::<LittleEndian>()?;

        let mut ime_file_name_buffer = [0; IME_FILE_NAME_SIZE];
        buffer.read_exact(&mut ime_file_name_buffer)?;
        let ime_file_name = utils::bytes_to_utf16_string(ime_file_name_buffer.as_ref())
            .trim_end_matches('\u{0}')
            .into();

        let optional_data = ClientCoreOptionalData::from_buffer(&mut buffer)?;

        Ok(Self {
            version,
            desktop_width,
            desktop_height,
            color_depth,
            sec_access_sequence,
            keyboard_layout,
            client_build,
            client_name,
            keyboard_type,
            keyboard_subtype,
            keyboard_functional_keys_count,
            ime_file_name,
            optional_data,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        let mut client_name = utils::string_to_utf16(self.client_name.as_str());
        client_name.resize(CLIENT_NAME_SIZE - 2, 0);
        let mut ime_file_name = utils::string_to_utf16(self.ime_file_name.as_str());
        ime_file_name.resize(IME_FILE_NAME_SIZE - 2, 0);

        buffer.write_u32::<LittleEndian>(self.version.0)?;
        buffer.write_u16::<LittleEndian>(self.desktop_width)?;
        buffer.write_u16::<LittleEndian>(self.desktop_height)?;
        buffer.write_u16::<LittleEndian>(self.color_depth.to_u16().unwrap())?;
        buffer.write_u16::<LittleEndian>(self.sec_access_sequence.to_u16().unwrap())?;
        buffer.write_u32::<LittleEndian>(self.keyboard_layout)?;
        buffer.write_u32::<LittleEndian>(self.client_build)?;
        buffer.write_all(client_name.as_ref())?;
        buffer.write_u16::<LittleEndian>(0)?; // client name null terminator
        buffer.write_u32::<LittleEndian>(self.keyboard_type.to_u32().unwrap())?;
        buffer.write_u32::<LittleEndian>(self.keyboard_subtype)?;
        buffer.write_u32::<LittleEndian>(self.keyboard_functional_keys_count)?;
        buffer.write_all(ime_file_name.as_ref())?;
        buffer.write_u16::<LittleEndian>(0)?; // IME file name null terminator

        self.optional_data.to_buffer(&mut buffer)
    }

    fn buffer_length(&self) -> usize {
        FIXED_PART_SIZE + self.optional_data.buffer_length()
    }
}

/// TS_UD_CS_CORE, optional tail. Each field requires all the previous ones on
/// the wire; serialization stops at the first absent one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientCoreOptionalData {
    pub post_beta2_color_depth: Option<ColorDepth>,
    pub client_product_id: Option<u16>,
    pub serial_number: Option<u32>,
    pub high_color_depth: Option<HighColorDepth>,
    pub supported_color_depths: Option<SupportedColorDepths>,
    pub early_capability_flags: Option<ClientEarlyCapabilityFlags>,
    pub dig_product_id: Option<String>,
    pub connection_type: Option<ConnectionType>,
    pub server_selected_protocol: Option<SecurityProtocol>,
}

impl PduParsing for ClientCoreOptionalData {
    type Error = CoreDataError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let mut optional_data = Self::default();

        optional_data.post_beta2_color_depth = Some(
            ColorDepth::from_u16(try_read_optional!(
                buffer.read_u16::<LittleEndian>(),
                optional_data
            ))
            .ok_or(CoreDataError::InvalidPostBetaColorDepth)?,
        );

        optional_data.client_product_id = Some(try_read_optional!(
            buffer.read_u16::<LittleEndian>(),
            optional_data
        ));

        optional_data.serial_number = Some(try_read_optional!(
            buffer.read_u32::<LittleEndian>(),
            optional_data
        ));

        optional_data.high_color_depth = Some(
            HighColorDepth::from_u16(try_read_optional!(
                buffer.read_u16::<LittleEndian>(),
                optional_data
            ))
            .ok_or(CoreDataError::InvalidHighColorDepth)?,
        );

        optional_data.supported_color_depths = Some(
            SupportedColorDepths::from_bits(try_read_optional!(
                buffer.read_u16::<LittleEndian>(),
                optional_data
            ))
            .ok_or(CoreDataError::InvalidSupportedColorDepths)?,
        );

        optional_data.early_capability_flags = Some(
            ClientEarlyCapabilityFlags::from_bits(try_read_optional!(
                buffer.read_u16::<LittleEndian>(),
                optional_data
            ))
            .ok_or(CoreDataError::InvalidEarlyCapabilityFlags)?,
        );

        let mut dig_product_id_buffer = [0; DIG_PRODUCT_ID_SIZE];
        try_read_optional!(buffer.read_exact(&mut dig_product_id_buffer), optional_data);
        optional_data.dig_product_id = Some(
            utils::bytes_to_utf16_string(dig_product_id_buffer.as_ref())
                .trim_end_matches('\u{0}')
                .into(),
        );

        optional_data.connection_type = Some(
            ConnectionType::from_u8(try_read_optional!(buffer.read_u8(), optional_data))
                .ok_or(CoreDataError::InvalidConnectionType)?,
        );
        try_read_optional!(buffer.read_u8(), optional_data); // pad1octet

        optional_data.server_selected_protocol = Some(
            SecurityProtocol::from_bits(try_read_optional!(
                buffer.read_u32::<LittleEndian>(),
                optional_data
            ))
            .ok_or(CoreDataError::InvalidServerSecurityProtocol)?,
        );

        Ok(optional_data)
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        try_write_optional!(self.post_beta2_color_depth, |value: &ColorDepth| buffer
            .write_u16::<LittleEndian>(value.to_u16().unwrap()));
        try_write_optional!(self.client_product_id, |value: &u16| buffer
            .write_u16::<LittleEndian>(*value));
        try_write_optional!(self.serial_number, |value: &u32| buffer
            .write_u32::<LittleEndian>(*value));
        try_write_optional!(self.high_color_depth, |value: &HighColorDepth| buffer
            .write_u16::<LittleEndian>(value.to_u16().unwrap()));
        try_write_optional!(
            self.supported_color_depths,
            |value: &SupportedColorDepths| buffer.write_u16::<LittleEndian>(value.bits())
        );
        try_write_optional!(
            self.early_capability_flags,
            |value: &ClientEarlyCapabilityFlags| buffer.write_u16::<LittleEndian>(value.bits())
        );
        try_write_optional!(self.dig_product_id, |value: &String| {
            let mut dig_product_id = utils::string_to_utf16(value.as_str());
            dig_product_id.resize(DIG_PRODUCT_ID_SIZE - 2, 0);
            buffer.write_all(dig_product_id.as_ref())?;
            buffer.write_u16::<LittleEndian>(0) // null terminator
        });
        try_write_optional!(self.connection_type, |value: &ConnectionType| {
            buffer.write_u8(value.to_u8().unwrap())?;
            buffer.write_u8(0) // pad1octet
        });
        try_write_optional!(self.server_selected_protocol, |value: &SecurityProtocol| {
            buffer.write_u32::<LittleEndian>(value.bits())
        });

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        let mut size = 0;

        if self.post_beta2_color_depth.is_some() {
            size += 2;
        }
        if self.client_product_id.is_some() {
            size += 2;
        }
        if self.serial_number.is_some() {
            size += 4;
        }
        if self.high_color_depth.is_some() {
            size += 2;
        }
        if self.supported_color_depths.is_some() {
            size += 2;
        }
        if self.early_capability_flags.is_some() {
            size += 2;
        }
        if self.dig_product_id.is_some() {
            size += DIG_PRODUCT_ID_SIZE;
        }
        if self.connection_type.is_some() {
            size += 2;
        }
        if self.server_selected_protocol.is_some() {
            size += 4;
        }

        size
    }
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum ColorDepth {
    Bpp4 = 0xCA00,
    Bpp8 = 0xCA01,
    Rgb555Bpp16 = 0xCA02,
    Rgb565Bpp16 = 0xCA03,
    Bpp24 = 0xCA04,
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, FromPrimitive, ToPrimitive)]
pub enum HighColorDepth {
    Bpp4 = 4,
    Bpp8 = 8,
    Bpp15 = 15,
    Bpp16 = 16,
    Bpp24 = 24,
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum SecureAccessSequence {
    Del = 0xAA03,
}

#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum KeyboardType {
    IbmPcXt = 1,
    OlivettiIco = 2,
    IbmPcAt = 3,
    IbmEnhanced = 4,
    Nokia1050 = 5,
    Nokia9140 = 6,
    Japanese = 7,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum ConnectionType {
    NotUsed = 0,
    Modem = 1,
    BroadbandLow = 2,
    Satellite = 3,
    BroadbandHigh = 4,
    Wan = 5,
    Lan = 6,
    AutoDetect = 7,
}

bitflags! {
    pub struct SupportedColorDepths: u16 {
        const BPP24 = 1;
        const BPP16 = 2;
        const BPP15 = 4;
        const BPP32 = 8;
    }
}

bitflags! {
    pub struct ClientEarlyCapabilityFlags: u16 {
        const SUPPORT_ERR_INFO_PDU = 0x0001;
        const WANT_32_BPP_SESSION = 0x0002;
        const SUPPORT_STATUS_INFO_PDU = 0x0004;
        const STRONG_ASYMMETRIC_KEYS = 0x0008;
        const VALID_CONNECTION_TYPE = 0x0020;
        const SUPPORT_MONITOR_LAYOUT_PDU = 0x0040;
        const SUPPORT_NETCHAR_AUTODETECT = 0x0080;
        const SUPPORT_DYNVC_GFX_PROTOCOL = 0x0100;
        const SUPPORT_DYNAMIC_TIME_ZONE = 0x0200;
        const SUPPORT_HEARTBEAT_PDU = 0x0400;
    }
}
