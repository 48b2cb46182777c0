use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

const FLAGS_SIZE: usize = 4;
const CHUNK_SIZE_SIZE: usize = 4;

/// TS_VIRTUALCHANNEL_CAPABILITYSET. The chunk size field is optional on the
/// wire; servers before RDP 7 omit it.
#[derive(Debug, PartialEq, Clone)]
pub struct VirtualChannel {
    pub flags: VirtualChannelFlags,
    pub chunk_size: Option<u32>,
}

impl PduParsing for VirtualChannel {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let flags = VirtualChannelFlags::from_bits_truncate(buffer.read_u32::<LittleEndian>()?);

        let chunk_size = match buffer.read_u32::<LittleEndian>() {
            Ok(chunk_size) => Some(chunk_size),
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
            Err(e) => return Err(CapabilitySetsError::from(e)),
        };

        Ok(Self { flags, chunk_size })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u32::<LittleEndian>(self.flags.bits())?;

        if let Some(chunk_size) = self.chunk_size {
            buffer.write_u32::<LittleEndian>(chunk_size)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        FLAGS_SIZE + self.chunk_size.map(|_| CHUNK_SIZE_SIZE).unwrap_or(0)
    }
}

bitflags! {
    pub struct VirtualChannelFlags: u32 {
        const COMPRESSION_SERVER_TO_CLIENT = 1;
        const COMPRESSION_CLIENT_TO_SERVER_8K = 2;
    }
}
