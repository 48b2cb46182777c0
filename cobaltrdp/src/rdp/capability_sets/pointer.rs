use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

const POINTER_LENGTH: usize = 6;

/// TS_POINTER_CAPABILITYSET.
#[derive(Debug, PartialEq, Clone)]
pub struct Pointer {
    pub color_pointer_cache_size: u16,
    pub pointer_cache_size: u16,
}

impl PduParsing for Pointer {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let _color_pointer_flag = buffer.read_u16::<LittleEndian>()?;
        let color_pointer_cache_size = buffer.read_u16::<LittleEndian>()?;
        let pointer_cache_size = match buffer.read_u16::<LittleEndian>() {
            Ok(value) => value,
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(CapabilitySetsError::from(e)),
        };

        Ok(Self {
            color_pointer_cache_size,
            pointer_cache_size,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u16::<LittleEndian>(1)?; // colorPointerFlag
        buffer.write_u16::<LittleEndian>(self.color_pointer_cache_size)?;
        buffer.write_u16::<LittleEndian>(self.pointer_cache_size)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        POINTER_LENGTH
    }
}
