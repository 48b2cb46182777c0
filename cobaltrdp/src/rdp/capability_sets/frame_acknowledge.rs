use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

/// TS_FRAME_ACKNOWLEDGE_CAPABILITYSET. A server that sends it expects Frame
/// Acknowledge PDUs for surface-command frames.
#[derive(Debug, PartialEq, Clone)]
pub struct FrameAcknowledge {
    pub max_unacknowledged_frame_count: u32,
}

impl PduParsing for FrameAcknowledge {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let max_unacknowledged_frame_count = buffer.read_u32::<LittleEndian>()?;

        Ok(Self {
            max_unacknowledged_frame_count,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u32::<LittleEndian>(self.max_unacknowledged_frame_count)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        4
    }
}
