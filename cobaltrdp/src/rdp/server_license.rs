#[cfg(test)]
mod tests;

use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use crate::PduParsing;

const PREAMBLE_SIZE: usize = 4;
const ERROR_CODE_SIZE: usize = 4;
const STATE_TRANSITION_SIZE: usize = 4;
const BLOB_TYPE_SIZE: usize = 2;
const BLOB_LENGTH_SIZE: usize = 2;

const PROTOCOL_VERSION_MASK: u8 = 0x0F;

/// The licensing exchange as this client understands it: either the server
/// granted a license outright (new-license) or it reported the error-alert
/// every licensing-free server sends, which must carry STATUS_VALID_CLIENT
/// with no state transition. Anything else ends the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerLicense {
    NewLicense,
    ValidClient(LicensingErrorMessage),
}

impl PduParsing for ServerLicense {
    type Error = ServerLicenseError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let preamble = LicensePreamble::from_buffer(&mut stream)?;

        match preamble.message_type {
            PreambleType::NewLicense => Ok(ServerLicense::NewLicense),
            PreambleType::ErrorAlert => {
                let error_message = LicensingErrorMessage::from_buffer(&mut stream)?;

                if error_message.error_code == LicensingErrorCode::StatusValidClient
                    && error_message.state_transition == LicensingStateTransition::NoTransition
                {
                    Ok(ServerLicense::ValidClient(error_message))
                } else {
                    Err(ServerLicenseError::UnexpectedError(error_message))
                }
            }
            message_type => Err(ServerLicenseError::UnexpectedLicenseMessage(message_type)),
        }
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        match self {
            ServerLicense::NewLicense => {
                let preamble = LicensePreamble::new(PreambleType::NewLicense);
                preamble.to_buffer(&mut stream, self.buffer_length() as u16)?;

                Ok(())
            }
            ServerLicense::ValidClient(error_message) => {
                let preamble = LicensePreamble::new(PreambleType::ErrorAlert);
                preamble.to_buffer(&mut stream, self.buffer_length() as u16)?;
                error_message.to_buffer(&mut stream)?;

                Ok(())
            }
        }
    }

    fn buffer_length(&self) -> usize {
        PREAMBLE_SIZE
            + match self {
                ServerLicense::NewLicense => 0,
                ServerLicense::ValidClient(error_message) => error_message.buffer_length(),
            }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LicensePreamble {
    message_type: PreambleType,
    flags: PreambleFlags,
    version: PreambleVersion,
}

impl LicensePreamble {
    fn new(message_type: PreambleType) -> Self {
        Self {
            message_type,
            flags: PreambleFlags::empty(),
            version: PreambleVersion::V3,
        }
    }

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, ServerLicenseError> {
        let message_type = PreambleType::from_u8(stream.read_u8()?)
            .ok_or(ServerLicenseError::InvalidLicenseType)?;
        let flags_with_version = stream.read_u8()?;
        let _packet_size = stream.read_u16::<LittleEndian>()?;

        let flags = PreambleFlags::from_bits(flags_with_version & !PROTOCOL_VERSION_MASK)
            .ok_or_else(|| {
                ServerLicenseError::InvalidPreamble(String::from("got invalid flags field"))
            })?;
        let version = PreambleVersion::from_u8(flags_with_version & PROTOCOL_VERSION_MASK)
            .ok_or_else(|| {
                ServerLicenseError::InvalidPreamble(String::from(
                    "got invalid version in the flags field",
                ))
            })?;

        Ok(Self {
            message_type,
            flags,
            version,
        })
    }

    fn to_buffer(
        &self,
        mut stream: impl io::Write,
        message_size: u16,
    ) -> Result<(), ServerLicenseError> {
        let flags_with_version = self.flags.bits() | self.version.to_u8().unwrap();

        stream.write_u8(self.message_type.to_u8().unwrap())?;
        stream.write_u8(flags_with_version)?;
        stream.write_u16::<LittleEndian>(message_size)?;

        Ok(())
    }
}

/// LICENSE_ERROR_MESSAGE.
#[derive(Debug, Clone, PartialEq)]
pub struct LicensingErrorMessage {
    pub error_code: LicensingErrorCode,
    pub state_transition: LicensingStateTransition,
    pub error_info: LicensingBinaryBlob,
}

impl LicensingErrorMessage {
    pub fn valid_client() -> Self {
        Self {
            error_code: LicensingErrorCode::StatusValidClient,
            state_transition: LicensingStateTransition::NoTransition,
            error_info: LicensingBinaryBlob {
                blob_type: BlobType::Error,
                data: Vec::new(),
            },
        }
    }
}

impl PduParsing for LicensingErrorMessage {
    type Error = ServerLicenseError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let error_code = LicensingErrorCode::from_u32(stream.read_u32::<LittleEndian>()?)
            .ok_or(ServerLicenseError::InvalidErrorCode)?;
        let state_transition =
            LicensingStateTransition::from_u32(stream.read_u32::<LittleEndian>()?)
                .ok_or(ServerLicenseError::InvalidStateTransition)?;
        let error_info = LicensingBinaryBlob::from_buffer(&mut stream)?;

        Ok(Self {
            error_code,
            state_transition,
            error_info,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u32::<LittleEndian>(self.error_code.to_u32().unwrap())?;
        stream.write_u32::<LittleEndian>(self.state_transition.to_u32().unwrap())?;
        self.error_info.to_buffer(&mut stream)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        ERROR_CODE_SIZE + STATE_TRANSITION_SIZE + self.error_info.buffer_length()
    }
}

/// LICENSE_BINARY_BLOB.
#[derive(Debug, Clone, PartialEq)]
pub struct LicensingBinaryBlob {
    pub blob_type: BlobType,
    pub data: Vec<u8>,
}

impl PduParsing for LicensingBinaryBlob {
    type Error = ServerLicenseError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let blob_type = BlobType::from_u16(stream.read_u16::<LittleEndian>()?)
            .ok_or(ServerLicenseError::InvalidBlobType)?;
        let blob_len = usize::from(stream.read_u16::<LittleEndian>()?);

        let mut data = vec![0; blob_len];
        stream.read_exact(&mut data)?;

        Ok(Self { blob_type, data })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u16::<LittleEndian>(self.blob_type.to_u16().unwrap())?;
        stream.write_u16::<LittleEndian>(self.data.len() as u16)?;
        stream.write_all(self.data.as_ref())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        BLOB_TYPE_SIZE + BLOB_LENGTH_SIZE + self.data.len()
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum PreambleType {
    LicenseRequest = 0x01,
    PlatformChallenge = 0x02,
    NewLicense = 0x03,
    UpgradeLicense = 0x04,
    LicenseInfo = 0x12,
    NewLicenseRequest = 0x13,
    PlatformChallengeResponse = 0x15,
    ErrorAlert = 0xff,
}

bitflags! {
    pub struct PreambleFlags: u8 {
        const EXTENDED_ERROR_MSG_SUPPORTED = 0x80;
    }
}

#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum PreambleVersion {
    V2 = 2, // RDP 4.0
    V3 = 3, // RDP 5.0 and up
}

#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum LicensingErrorCode {
    InvalidServerCertificate = 0x01,
    NoLicense = 0x02,
    InvalidMac = 0x03,
    InvalidScope = 0x04,
    NoLicenseServer = 0x06,
    StatusValidClient = 0x07,
    InvalidClient = 0x08,
    InvalidProductId = 0x0b,
    InvalidMessageLen = 0x0c,
}

#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum LicensingStateTransition {
    TotalAbort = 1,
    NoTransition = 2,
    ResetPhaseToStart = 3,
    ResendLastMessage = 4,
}

#[derive(Debug, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum BlobType {
    // not in the protocol tables, but xrdp puts a zero blob type into its
    // error alert and the field must be ignored there anyway
    Ignored = 0x00,
    Data = 0x01,
    Random = 0x02,
    Certificate = 0x03,
    Error = 0x04,
    EncryptedData = 0x09,
    KeyExchangeAlgorithm = 0x0d,
    Scope = 0x0e,
    ClientUserName = 0x0f,
    ClientMachineNameBlob = 0x10,
}

#[derive(Debug, Fail)]
pub enum ServerLicenseError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "invalid preamble field: {}", _0)]
    InvalidPreamble(String),
    #[fail(display = "invalid preamble message type field")]
    InvalidLicenseType,
    #[fail(display = "invalid error code field")]
    InvalidErrorCode,
    #[fail(display = "invalid state transition field")]
    InvalidStateTransition,
    #[fail(display = "invalid blob type field")]
    InvalidBlobType,
    #[fail(display = "unexpected licensing message type: {:?}", _0)]
    UnexpectedLicenseMessage(PreambleType),
    #[fail(display = "the server reported a licensing error: {:?}", _0)]
    UnexpectedError(LicensingErrorMessage),
}

impl_from_error!(io::Error, ServerLicenseError, ServerLicenseError::IOError);
