use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::PduParsing;

pub const CHANNEL_PDU_HEADER_SIZE: usize = 8;

/// CHANNEL_PDU_HEADER: wraps every static virtual channel chunk. This client
/// never fragments, so outgoing chunks carry FIRST and LAST together.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPduHeader {
    pub total_length: u32,
    pub flags: ChannelControlFlags,
}

impl ChannelPduHeader {
    pub fn whole(total_length: u32) -> Self {
        Self {
            total_length,
            flags: ChannelControlFlags::FLAG_FIRST | ChannelControlFlags::FLAG_LAST,
        }
    }
}

impl PduParsing for ChannelPduHeader {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let total_length = stream.read_u32::<LittleEndian>()?;
        let flags = ChannelControlFlags::from_bits_truncate(stream.read_u32::<LittleEndian>()?);

        Ok(Self {
            total_length,
            flags,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u32::<LittleEndian>(self.total_length)?;
        stream.write_u32::<LittleEndian>(self.flags.bits())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        CHANNEL_PDU_HEADER_SIZE
    }
}

bitflags! {
    pub struct ChannelControlFlags: u32 {
        const FLAG_FIRST = 0x0000_0001;
        const FLAG_LAST = 0x0000_0002;
        const FLAG_SHOW_PROTOCOL = 0x0000_0010;
        const FLAG_SUSPEND = 0x0000_0020;
        const FLAG_RESUME = 0x0000_0040;
        const PACKET_COMPRESSED = 0x0020_0000;
        const PACKET_AT_FRONT = 0x0040_0000;
        const PACKET_FLUSHED = 0x0080_0000;
    }
}
