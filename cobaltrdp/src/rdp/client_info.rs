#[cfg(test)]
mod tests;

use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use crate::sspi::Credentials;
use crate::utils;
use crate::PduParsing;

const TIMEZONE_INFO_NAME_LEN: usize = 64;
const COMPRESSION_TYPE_MASK: u32 = 0x0000_1E00;
const NULL_TERMINATOR: char = '\u{0}';

const CODE_PAGE_SIZE: usize = 4;
const FLAGS_SIZE: usize = 4;
const STRING_LENGTH_SIZE: usize = 2;
const STRING_LENGTH_FIELDS: usize = 5;

const CLIENT_ADDRESS_FAMILY_SIZE: usize = 2;
const CLIENT_ADDRESS_LENGTH_SIZE: usize = 2;
const CLIENT_DIR_LENGTH_SIZE: usize = 2;
const SESSION_ID_SIZE: usize = 4;
const PERFORMANCE_FLAGS_SIZE: usize = 4;
const BIAS_SIZE: usize = 4;
const SYSTEM_TIME_SIZE: usize = 16;

/// TS_INFO_PACKET: credentials plus session-setup knobs. Sent once during the
/// secure settings exchange; the RAIL flag in here is what turns the session
/// into a RemoteApp one.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfo {
    pub credentials: Credentials,
    /// Ignored when the keyboard layout of the core data is zero.
    pub code_page: u32,
    pub flags: ClientInfoFlags,
    pub compression_type: CompressionType,
    pub alternate_shell: String,
    pub work_dir: String,
    pub extra_info: ExtendedClientInfo,
}

impl PduParsing for ClientInfo {
    type Error = ClientInfoError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let code_page = stream.read_u32::<LittleEndian>()?;
        let flags_with_compression_type = stream.read_u32::<LittleEndian>()?;

        let flags =
            ClientInfoFlags::from_bits(flags_with_compression_type & !COMPRESSION_TYPE_MASK)
                .ok_or(ClientInfoError::InvalidClientInfoFlags)?;
        let compression_type = CompressionType::from_u8(
            ((flags_with_compression_type & COMPRESSION_TYPE_MASK) >> 9) as u8,
        )
        .ok_or(ClientInfoError::InvalidClientInfoFlags)?;
        let character_set = character_set(flags);

        // sizes exclude the mandatory null terminator
        let domain_size = usize::from(stream.read_u16::<LittleEndian>()?);
        let user_name_size = usize::from(stream.read_u16::<LittleEndian>()?);
        let password_size = usize::from(stream.read_u16::<LittleEndian>()?);
        let alternate_shell_size = usize::from(stream.read_u16::<LittleEndian>()?);
        let work_dir_size = usize::from(stream.read_u16::<LittleEndian>()?);

        let domain = read_string(&mut stream, domain_size, character_set, true)?;
        let user_name = read_string(&mut stream, user_name_size, character_set, true)?;
        let password = read_string(&mut stream, password_size, character_set, true)?;

        let domain = if domain.is_empty() {
            None
        } else {
            Some(domain)
        };
        let credentials = Credentials::new(user_name, password, domain);

        let alternate_shell = read_string(&mut stream, alternate_shell_size, character_set, true)?;
        let work_dir = read_string(&mut stream, work_dir_size, character_set, true)?;

        let extra_info = ExtendedClientInfo::from_buffer(&mut stream, character_set)?;

        Ok(Self {
            credentials,
            code_page,
            flags,
            compression_type,
            alternate_shell,
            work_dir,
            extra_info,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        let character_set = character_set(self.flags);

        stream.write_u32::<LittleEndian>(self.code_page)?;

        let flags_with_compression_type =
            self.flags.bits() | (self.compression_type.to_u32().unwrap() << 9);
        stream.write_u32::<LittleEndian>(flags_with_compression_type)?;

        let domain = self.credentials.domain.clone().unwrap_or_default();
        stream.write_u16::<LittleEndian>(string_len(domain.as_str(), character_set))?;
        stream.write_u16::<LittleEndian>(string_len(
            self.credentials.username.as_str(),
            character_set,
        ))?;
        stream.write_u16::<LittleEndian>(string_len(
            self.credentials.password.as_str(),
            character_set,
        ))?;
        stream
            .write_u16::<LittleEndian>(string_len(self.alternate_shell.as_str(), character_set))?;
        stream.write_u16::<LittleEndian>(string_len(self.work_dir.as_str(), character_set))?;

        write_string_with_null_terminator(&mut stream, domain.as_str(), character_set)?;
        write_string_with_null_terminator(
            &mut stream,
            self.credentials.username.as_str(),
            character_set,
        )?;
        write_string_with_null_terminator(
            &mut stream,
            self.credentials.password.as_str(),
            character_set,
        )?;
        write_string_with_null_terminator(
            &mut stream,
            self.alternate_shell.as_str(),
            character_set,
        )?;
        write_string_with_null_terminator(&mut stream, self.work_dir.as_str(), character_set)?;

        self.extra_info.to_buffer(&mut stream, character_set)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        let character_set = character_set(self.flags);
        let domain = self.credentials.domain.clone().unwrap_or_default();

        CODE_PAGE_SIZE
            + FLAGS_SIZE
            + STRING_LENGTH_SIZE * STRING_LENGTH_FIELDS
            + usize::from(
                string_len(domain.as_str(), character_set)
                    + string_len(self.credentials.username.as_str(), character_set)
                    + string_len(self.credentials.password.as_str(), character_set)
                    + string_len(self.alternate_shell.as_str(), character_set)
                    + string_len(self.work_dir.as_str(), character_set),
            )
            + character_set.to_usize().unwrap() * STRING_LENGTH_FIELDS // null terminators
            + self.extra_info.buffer_length(character_set)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedClientInfo {
    pub address_family: AddressFamily,
    pub address: String,
    pub dir: String,
    pub optional_data: ExtendedClientOptionalInfo,
}

impl ExtendedClientInfo {
    fn from_buffer(
        mut stream: impl io::Read,
        character_set: CharacterSet,
    ) -> Result<Self, ClientInfoError> {
        let address_family = AddressFamily::from_u16(stream.read_u16::<LittleEndian>()?)
            .ok_or(ClientInfoError::InvalidAddressFamily)?;

        // these sizes include the mandatory null terminator
        let address_size = usize::from(stream.read_u16::<LittleEndian>()?);
        let address = read_string(&mut stream, address_size, character_set, false)?;

        let dir_size = usize::from(stream.read_u16::<LittleEndian>()?);
        let dir = read_string(&mut stream, dir_size, character_set, false)?;

        let optional_data = ExtendedClientOptionalInfo::from_buffer(&mut stream)?;

        Ok(Self {
            address_family,
            address,
            dir,
            optional_data,
        })
    }

    fn to_buffer(
        &self,
        mut stream: impl io::Write,
        character_set: CharacterSet,
    ) -> Result<(), ClientInfoError> {
        stream.write_u16::<LittleEndian>(self.address_family.to_u16().unwrap())?;

        stream.write_u16::<LittleEndian>(
            string_len(self.address.as_str(), character_set) + character_set.to_u16().unwrap(),
        )?;
        write_string_with_null_terminator(&mut stream, self.address.as_str(), character_set)?;

        stream.write_u16::<LittleEndian>(
            string_len(self.dir.as_str(), character_set) + character_set.to_u16().unwrap(),
        )?;
        write_string_with_null_terminator(&mut stream, self.dir.as_str(), character_set)?;

        self.optional_data.to_buffer(&mut stream)?;

        Ok(())
    }

    fn buffer_length(&self, character_set: CharacterSet) -> usize {
        CLIENT_ADDRESS_FAMILY_SIZE
            + CLIENT_ADDRESS_LENGTH_SIZE
            + usize::from(string_len(self.address.as_str(), character_set))
            + character_set.to_usize().unwrap()
            + CLIENT_DIR_LENGTH_SIZE
            + usize::from(string_len(self.dir.as_str(), character_set))
            + character_set.to_usize().unwrap()
            + self.optional_data.buffer_length()
    }
}

/// The optional tail of the extended info. Every field requires all its
/// predecessors on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtendedClientOptionalInfo {
    pub timezone: Option<TimezoneInfo>,
    pub session_id: Option<u32>,
    pub performance_flags: Option<PerformanceFlags>,
}

impl PduParsing for ExtendedClientOptionalInfo {
    type Error = ClientInfoError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let mut optional_data = Self::default();

        optional_data.timezone = match TimezoneInfo::from_buffer(&mut stream) {
            Ok(timezone) => Some(timezone),
            Err(ClientInfoError::IOError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(optional_data)
            }
            Err(e) => return Err(e),
        };
        optional_data.session_id = Some(try_read_optional!(
            stream.read_u32::<LittleEndian>(),
            optional_data
        ));
        optional_data.performance_flags = Some(
            PerformanceFlags::from_bits(try_read_optional!(
                stream.read_u32::<LittleEndian>(),
                optional_data
            ))
            .ok_or(ClientInfoError::InvalidPerformanceFlags)?,
        );

        Ok(optional_data)
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        try_write_optional!(self.timezone, |value: &TimezoneInfo| value
            .to_buffer(&mut stream));
        try_write_optional!(self.session_id, |value: &u32| stream
            .write_u32::<LittleEndian>(*value));
        try_write_optional!(self.performance_flags, |value: &PerformanceFlags| stream
            .write_u32::<LittleEndian>(value.bits()));

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        let mut size = 0;

        if let Some(ref timezone) = self.timezone {
            size += timezone.buffer_length();
        }
        if self.session_id.is_some() {
            size += SESSION_ID_SIZE;
        }
        if self.performance_flags.is_some() {
            size += PERFORMANCE_FLAGS_SIZE;
        }

        size
    }
}

/// TS_TIME_ZONE_INFORMATION.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimezoneInfo {
    pub bias: u32,
    pub standard_name: String,
    pub standard_date: SystemTime,
    pub standard_bias: u32,
    pub daylight_name: String,
    pub daylight_date: SystemTime,
    pub daylight_bias: u32,
}

impl PduParsing for TimezoneInfo {
    type Error = ClientInfoError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let bias = stream.read_u32::<LittleEndian>()?;

        let standard_name = read_string(
            &mut stream,
            TIMEZONE_INFO_NAME_LEN,
            CharacterSet::Unicode,
            false,
        )?;
        let standard_date = SystemTime::from_buffer(&mut stream)?;
        let standard_bias = stream.read_u32::<LittleEndian>()?;

        let daylight_name = read_string(
            &mut stream,
            TIMEZONE_INFO_NAME_LEN,
            CharacterSet::Unicode,
            false,
        )?;
        let daylight_date = SystemTime::from_buffer(&mut stream)?;
        let daylight_bias = stream.read_u32::<LittleEndian>()?;

        Ok(Self {
            bias,
            standard_name,
            standard_date,
            standard_bias,
            daylight_name,
            daylight_date,
            daylight_bias,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u32::<LittleEndian>(self.bias)?;

        let mut standard_name = utils::string_to_utf16(self.standard_name.as_str());
        standard_name.resize(TIMEZONE_INFO_NAME_LEN, 0);
        stream.write_all(standard_name.as_ref())?;

        self.standard_date.to_buffer(&mut stream)?;
        stream.write_u32::<LittleEndian>(self.standard_bias)?;

        let mut daylight_name = utils::string_to_utf16(self.daylight_name.as_str());
        daylight_name.resize(TIMEZONE_INFO_NAME_LEN, 0);
        stream.write_all(daylight_name.as_ref())?;

        self.daylight_date.to_buffer(&mut stream)?;
        stream.write_u32::<LittleEndian>(self.daylight_bias)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        BIAS_SIZE * 3 + TIMEZONE_INFO_NAME_LEN * 2 + SYSTEM_TIME_SIZE * 2
    }
}

/// The SYSTEMTIME layout timezone transition dates use.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SystemTime {
    pub year: u16,
    pub month: u16,
    pub day_of_week: u16,
    pub day: u16,
    pub hour: u16,
    pub minute: u16,
    pub second: u16,
    pub milliseconds: u16,
}

impl PduParsing for SystemTime {
    type Error = ClientInfoError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let year = stream.read_u16::<LittleEndian>()?;
        let month = stream.read_u16::<LittleEndian>()?;
        let day_of_week = stream.read_u16::<LittleEndian>()?;
        let day = stream.read_u16::<LittleEndian>()?;
        let hour = stream.read_u16::<LittleEndian>()?;
        let minute = stream.read_u16::<LittleEndian>()?;
        let second = stream.read_u16::<LittleEndian>()?;
        let milliseconds = stream.read_u16::<LittleEndian>()?;

        Ok(Self {
            year,
            month,
            day_of_week,
            day,
            hour,
            minute,
            second,
            milliseconds,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u16::<LittleEndian>(self.year)?;
        stream.write_u16::<LittleEndian>(self.month)?;
        stream.write_u16::<LittleEndian>(self.day_of_week)?;
        stream.write_u16::<LittleEndian>(self.day)?;
        stream.write_u16::<LittleEndian>(self.hour)?;
        stream.write_u16::<LittleEndian>(self.minute)?;
        stream.write_u16::<LittleEndian>(self.second)?;
        stream.write_u16::<LittleEndian>(self.milliseconds)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        SYSTEM_TIME_SIZE
    }
}

#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
#[repr(u16)]
pub enum AddressFamily {
    INet = 0x0002,
    INet6 = 0x0017,
}

#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
#[repr(u16)]
enum CharacterSet {
    Ansi = 1,
    Unicode = 2,
}

#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum CompressionType {
    K8 = 0,
    K64 = 1,
    Rdp6 = 2,
    Rdp61 = 3,
}

bitflags! {
    pub struct ClientInfoFlags: u32 {
        const MOUSE = 0x0000_0001;
        const DISABLE_CTRL_ALT_DEL = 0x0000_0002;
        const AUTOLOGON = 0x0000_0008;
        const UNICODE = 0x0000_0010;
        const MAXIMIZE_SHELL = 0x0000_0020;
        const LOGON_NOTIFY = 0x0000_0040;
        const COMPRESSION = 0x0000_0080;
        const ENABLE_WINDOWS_KEY = 0x0000_0100;
        const REMOTE_CONSOLE_AUDIO = 0x0000_2000;
        const FORCE_ENCRYPTED_CS_PDU = 0x0000_4000;
        const RAIL = 0x0000_8000;
        const LOGON_ERRORS = 0x0001_0000;
        const MOUSE_HAS_WHEEL = 0x0002_0000;
        const PASSWORD_IS_SC_PIN = 0x0004_0000;
        const NO_AUDIO_PLAYBACK = 0x0008_0000;
        const USING_SAVED_CREDS = 0x0010_0000;
        const AUDIO_CAPTURE = 0x0020_0000;
        const VIDEO_DISABLE = 0x0040_0000;
        const RESERVED1 = 0x0080_0000;
        const RESERVED2 = 0x0100_0000;
        const HIDEF_RAIL_SUPPORTED = 0x0200_0000;
    }
}

bitflags! {
    pub struct PerformanceFlags: u32 {
        const DISABLE_WALLPAPER = 0x0000_0001;
        const DISABLE_FULLWINDOWDRAG = 0x0000_0002;
        const DISABLE_MENUANIMATIONS = 0x0000_0004;
        const DISABLE_THEMING = 0x0000_0008;
        const DISABLE_CURSOR_SHADOW = 0x0000_0020;
        const DISABLE_CURSORSETTINGS = 0x0000_0040;
        const ENABLE_FONT_SMOOTHING = 0x0000_0080;
        const ENABLE_DESKTOP_COMPOSITION = 0x0000_0100;
    }
}

fn character_set(flags: ClientInfoFlags) -> CharacterSet {
    if flags.contains(ClientInfoFlags::UNICODE) {
        CharacterSet::Unicode
    } else {
        CharacterSet::Ansi
    }
}

fn string_len(value: &str, character_set: CharacterSet) -> u16 {
    match character_set {
        CharacterSet::Unicode => utils::string_to_utf16(value).len() as u16,
        CharacterSet::Ansi => value.len() as u16,
    }
}

fn read_string(
    mut stream: impl io::Read,
    size: usize,
    character_set: CharacterSet,
    read_null_terminator: bool,
) -> Result<String, ClientInfoError> {
    let size = size
        + if read_null_terminator {
            character_set.to_usize().unwrap()
        } else {
            0
        };
    let mut buffer = vec![0; size];
    stream.read_exact(buffer.as_mut())?;

    let result = match character_set {
        CharacterSet::Unicode => utils::bytes_to_utf16_string(buffer.as_slice()),
        CharacterSet::Ansi => String::from_utf8(buffer)
            .map_err(|_| ClientInfoError::InvalidAnsiString)?,
    };

    Ok(result.trim_end_matches(NULL_TERMINATOR).into())
}

fn write_string_with_null_terminator(
    mut stream: impl io::Write,
    value: &str,
    character_set: CharacterSet,
) -> io::Result<()> {
    match character_set {
        CharacterSet::Unicode => {
            stream.write_all(utils::string_to_utf16(value).as_ref())?;
            stream.write_u16::<LittleEndian>(0)
        }
        CharacterSet::Ansi => {
            stream.write_all(value.as_bytes())?;
            stream.write_u8(0)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use super::*;

    pub(crate) fn minimal_client_info() -> ClientInfo {
        ClientInfo {
            credentials: Credentials::new(
                String::from("User"),
                String::from("Password"),
                None,
            ),
            code_page: 0,
            flags: ClientInfoFlags::UNICODE,
            compression_type: CompressionType::K8,
            alternate_shell: String::new(),
            work_dir: String::new(),
            extra_info: ExtendedClientInfo {
                address_family: AddressFamily::INet,
                address: String::new(),
                dir: String::new(),
                optional_data: ExtendedClientOptionalInfo::default(),
            },
        }
    }
}

#[derive(Debug, Fail)]
pub enum ClientInfoError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "invalid address family field")]
    InvalidAddressFamily,
    #[fail(display = "invalid flags field")]
    InvalidClientInfoFlags,
    #[fail(display = "invalid performance flags field")]
    InvalidPerformanceFlags,
    #[fail(display = "invalid ANSI string field")]
    InvalidAnsiString,
}

impl_from_error!(io::Error, ClientInfoError, ClientInfoError::IOError);
