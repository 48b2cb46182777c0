use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;

use crate::PduParsing;

const ERROR_INFO_SIZE: usize = 4;

/// TS_SET_ERROR_INFO_PDU. These are informational: the dispatcher logs the
/// meaning and keeps reading.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSetErrorInfoPdu {
    pub error_info: u32,
}

impl ServerSetErrorInfoPdu {
    /// The human-readable meaning of the error code, for the log line.
    pub fn description(&self) -> &'static str {
        match self.error_info {
            0x0000_0000 => "no error",
            0x0000_0001 => "disconnected by an administrative tool",
            0x0000_0002 => "disconnected due to a forced logoff",
            0x0000_0003 => "idle session time limit reached",
            0x0000_0004 => "active session time limit reached",
            0x0000_0005 => "another user connected to the session",
            0x0000_0006 => "the server ran out of memory",
            0x0000_0007 => "the server denied the connection",
            0x0000_0009 => "the user does not have connect access",
            0x0000_000A => "fresh credentials are required",
            0x0000_000B => "disconnected by the user on the server side",
            0x0000_000C => "logged off by the user on the server side",
            0x0000_0010 => "licensing mode could not be determined",
            0x0000_0011 => "no license server was available",
            0x0000_0100 => "internal licensing error",
            0x0000_0400 => "dynamic virtual channel decompression error",
            0x0000_10C9 => "an unexpected DATA PDU was received",
            0x0000_10CA => "an unexpected control PDU was received",
            0x0000_10CB => "an input PDU arrived before the session was active",
            0x0000_10CD => "an invalid control PDU action was received",
            0x0000_10CE => "an invalid input PDU event was received",
            0x0000_10CF => "an invalid input PDU mouse field was received",
            0x0000_10D3 => "an invalid Refresh Rect PDU was received",
            0x0000_10D4 => "the server failed to construct its connect response",
            0x0000_10D5 => "the Confirm Active PDU was malformed",
            0x0000_10DA => "a capability set was too small",
            0x0000_10DB => "a capability set was too large",
            0x0000_10DC => "virtual channel decompression error",
            0x0000_10DD => "an invalid virtual channel chunk length was received",
            _ => "unrecognized error code",
        }
    }
}

impl PduParsing for ServerSetErrorInfoPdu {
    type Error = ServerErrorInfoError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let error_info = stream.read_u32::<LittleEndian>()?;

        Ok(Self { error_info })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u32::<LittleEndian>(self.error_info)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        ERROR_INFO_SIZE
    }
}

#[derive(Debug, Fail)]
pub enum ServerErrorInfoError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
}

impl_from_error!(io::Error, ServerErrorInfoError, ServerErrorInfoError::IOError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_info_round_trips_and_describes_known_codes() {
        let pdu = ServerSetErrorInfoPdu {
            error_info: 0x0000_000B,
        };

        let mut buffer = Vec::new();
        pdu.to_buffer(&mut buffer).unwrap();
        assert_eq!(vec![0x0b, 0x00, 0x00, 0x00], buffer);

        let parsed = ServerSetErrorInfoPdu::from_buffer(buffer.as_slice()).unwrap();
        assert_eq!(
            "disconnected by the user on the server side",
            parsed.description()
        );
    }

    #[test]
    fn unknown_codes_still_parse() {
        let parsed = ServerSetErrorInfoPdu::from_buffer([0xff, 0xee, 0xdd, 0xcc].as_ref()).unwrap();

        assert_eq!(0xccdd_eeff, parsed.error_info);
        assert_eq!("unrecognized error code", parsed.description());
    }
}
