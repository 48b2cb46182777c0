use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive as _;

use crate::PduParsing;

const REDIRECTION_VERSION_MASK: u32 = 0x0000_003C;
const REDIRECTION_SUPPORTED: u32 = 0x0000_0001;

const FLAGS_SIZE: usize = 4;
const REDIRECTED_SESSION_ID_SIZE: usize = 4;

/// TS_UD_CS_CLUSTER. Carries the redirection version the client understands
/// and, on reconnect, the redirected session id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientClusterData {
    pub redirection_version: RedirectionVersion,
    pub redirected_session_id: u32,
}

impl PduParsing for ClientClusterData {
    type Error = ClusterDataError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let flags = buffer.read_u32::<LittleEndian>()?;
        let redirected_session_id = buffer.read_u32::<LittleEndian>()?;

        let redirection_version =
            RedirectionVersion::from_u8(((flags & REDIRECTION_VERSION_MASK) >> 2) as u8)
                .ok_or(ClusterDataError::InvalidRedirectionFlags)?;

        Ok(Self {
            redirection_version,
            redirected_session_id,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        let flags = REDIRECTION_SUPPORTED | ((self.redirection_version as u32) << 2);

        buffer.write_u32::<LittleEndian>(flags)?;
        buffer.write_u32::<LittleEndian>(self.redirected_session_id)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        FLAGS_SIZE + REDIRECTED_SESSION_ID_SIZE
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum RedirectionVersion {
    V1 = 0,
    V2 = 1,
    V3 = 2,
    V4 = 3,
    V5 = 4,
    V6 = 5,
}

#[derive(Debug, Fail)]
pub enum ClusterDataError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "invalid redirection flags field")]
    InvalidRedirectionFlags,
}

impl_from_error!(io::Error, ClusterDataError, ClusterDataError::IOError);
