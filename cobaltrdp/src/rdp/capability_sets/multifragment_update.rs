use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

/// TS_MULTIFRAGMENTUPDATE_CAPABILITYSET: the largest update the peer will
/// reassemble. Raised by the client when the server offers RemoteFX, whose
/// tiles do not fit small request sizes.
#[derive(Debug, PartialEq, Clone)]
pub struct MultifragmentUpdate {
    pub max_request_size: u32,
}

impl PduParsing for MultifragmentUpdate {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let max_request_size = buffer.read_u32::<LittleEndian>()?;

        Ok(Self { max_request_size })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u32::<LittleEndian>(self.max_request_size)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        4
    }
}
