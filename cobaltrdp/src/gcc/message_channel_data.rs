use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::PduParsing;

/// TS_UD_SC_MCS_MSGCHANNEL: the MCS channel ID of the server's message
/// channel. Parsed so the connect response stays readable, otherwise unused.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerMessageChannelData {
    pub mcs_message_channel_id: u16,
}

impl PduParsing for ServerMessageChannelData {
    type Error = io::Error;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let mcs_message_channel_id = buffer.read_u16::<LittleEndian>()?;

        Ok(Self {
            mcs_message_channel_id,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u16::<LittleEndian>(self.mcs_message_channel_id)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        2
    }
}
