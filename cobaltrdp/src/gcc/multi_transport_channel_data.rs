use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::PduParsing;

const FLAGS_SIZE: usize = 4;

/// TS_UD_CS_MULTITRANSPORT / TS_UD_SC_MULTITRANSPORT: both directions carry
/// the same single flags field.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTransportChannelData {
    pub flags: MultiTransportFlags,
}

impl PduParsing for MultiTransportChannelData {
    type Error = io::Error;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let flags = MultiTransportFlags::from_bits_truncate(buffer.read_u32::<LittleEndian>()?);

        Ok(Self { flags })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u32::<LittleEndian>(self.flags.bits())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        FLAGS_SIZE
    }
}

bitflags! {
    pub struct MultiTransportFlags: u32 {
        const TRANSPORT_TYPE_UDP_FECR = 0x01;
        const TRANSPORT_TYPE_UDP_FECL = 0x04;
        const TRANSPORT_TYPE_UDP_PREFERRED = 0x100;
        const SOFT_SYNC_TCP_TO_UDP = 0x200;
    }
}
