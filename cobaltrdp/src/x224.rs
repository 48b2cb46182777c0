#[cfg(test)]
mod tests;

use std::io;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use crate::{nego::NegotiationError, PduParsing};

pub const TPKT_HEADER_LENGTH: usize = 4;
pub const TPDU_DATA_HEADER_LENGTH: usize = 3;

pub const TPDU_REQUEST_LENGTH: usize = TPKT_HEADER_LENGTH + TPDU_REQUEST_HEADER_LENGTH;
pub const TPDU_REQUEST_HEADER_LENGTH: usize = 7;

const TPKT_VERSION: u8 = 3;

const EOT: u8 = 0x80;

/// The PDU type of the X.224 negotiation phase.
#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive, ToPrimitive)]
pub enum X224TPDUType {
    ConnectionRequest = 0xE0,
    ConnectionConfirm = 0xD0,
    DisconnectRequest = 0x80,
    Data = 0xF0,
    Error = 0x70,
}

/// The length-prefixed record framing every slow-path PDU travels in. The
/// length field covers the whole record, header included, and is the one
/// big-endian integer in the RDP stack.
#[derive(Debug, PartialEq)]
pub struct TpktHeader {
    pub length: usize,
}

impl TpktHeader {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl PduParsing for TpktHeader {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let version = stream.read_u8()?;
        if version != TPKT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid TPKT header version",
            ));
        }

        let _reserved = stream.read_u8()?;
        let length = usize::from(stream.read_u16::<BigEndian>()?);

        Ok(Self { length })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u8(TPKT_VERSION)?;
        stream.write_u8(0)?; // reserved
        stream.write_u16::<BigEndian>(self.length as u16)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        TPKT_HEADER_LENGTH
    }
}

/// An X.224 data TPDU: a TPKT record around a 3-byte DT header. Everything
/// after the connection phase travels in these.
#[derive(Debug, PartialEq)]
pub struct Data {
    pub data_length: usize,
}

impl Data {
    pub fn new(data_length: usize) -> Self {
        Self { data_length }
    }
}

impl PduParsing for Data {
    type Error = NegotiationError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let tpkt = TpktHeader::from_buffer(&mut stream)?;

        read_and_check_tpdu_header(&mut stream, X224TPDUType::Data)?;

        let _eot = stream.read_u8()?;

        let data_length = tpkt
            .length
            .checked_sub(TPKT_HEADER_LENGTH + TPDU_DATA_HEADER_LENGTH)
            .ok_or_else(|| {
                NegotiationError::IOError(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "TPKT length is too small for an X.224 data TPDU",
                ))
            })?;

        Ok(Self { data_length })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        TpktHeader::new(self.buffer_length()).to_buffer(&mut stream)?;

        stream.write_u8(TPDU_DATA_HEADER_LENGTH as u8 - 1)?;
        stream.write_u8(X224TPDUType::Data.to_u8().unwrap())?;
        stream.write_u8(EOT)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        TPKT_HEADER_LENGTH + TPDU_DATA_HEADER_LENGTH + self.data_length
    }
}

pub fn read_and_check_tpdu_header(
    mut stream: impl io::Read,
    required_code: X224TPDUType,
) -> Result<(), NegotiationError> {
    let _tpdu_length = usize::from(stream.read_u8()?);

    let code = X224TPDUType::from_u8(stream.read_u8()?).ok_or_else(|| {
        NegotiationError::IOError(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid X.224 TPDU code",
        ))
    })?;

    if code != required_code {
        return Err(NegotiationError::IOError(io::Error::new(
            io::ErrorKind::InvalidData,
            "unexpected X.224 TPDU code",
        )));
    }

    Ok(())
}

pub fn write_request_tpdu_header(
    mut stream: impl io::Write,
    code: X224TPDUType,
    tpdu_length: u8,
    src_ref: u16,
) -> io::Result<()> {
    // the header length field does not count itself
    stream.write_u8(tpdu_length - 1)?;
    stream.write_u8(code.to_u8().unwrap())?;
    stream.write_u16::<LittleEndian>(0)?; // dst_ref
    stream.write_u16::<LittleEndian>(src_ref)?;
    stream.write_u8(0)?; // class

    Ok(())
}
