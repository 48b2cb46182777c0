#[cfg(test)]
mod tests;

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use crate::per;

const FAST_PATH_ACTION_MASK: u8 = 0x03;
const FAST_PATH_INPUT_ACTION: u8 = 0x00;

const UPDATE_CODE_MASK: u8 = 0x0F;
const FRAGMENTATION_MASK: u8 = 0x03;
const COMPRESSION_USED: u8 = 0x02;

/// The outer header of a server-to-client FastPath record. The low two bits
/// of the first byte are zero, which is what tells it apart from a TPKT
/// record (first byte 0x03) on the same stream.
#[derive(Debug, PartialEq)]
pub struct FastPathHeader {
    pub encryption_flags: u8,
    pub number_of_events: u8,
    pub data_length: u16,
}

/// Parses the FastPath header and returns it together with the total record
/// length as written on the wire.
pub fn parse_fast_path_header(
    mut stream: impl io::Read,
) -> Result<(FastPathHeader, u16), FastPathError> {
    let header = stream.read_u8()?;

    let (length, sizeof_length) = per::read_length(&mut stream)?;
    if length < sizeof_length as u16 + 1 {
        return Err(FastPathError::NullLength {
            bytes_read: sizeof_length + 1,
        });
    }

    let data_length = length - sizeof_length as u16 - 1;

    Ok((
        FastPathHeader {
            encryption_flags: (header & 0xC0) >> 6,
            number_of_events: (header & 0x3C) >> 2,
            data_length,
        },
        length,
    ))
}

/// Returns whether a peeked first byte belongs to a FastPath record.
pub fn is_fast_path_byte(byte: u8) -> bool {
    byte & FAST_PATH_ACTION_MASK == 0
}

/// One server-to-client FastPath update, carried inside a FastPath record.
#[derive(Debug, Clone, PartialEq)]
pub struct FastPathUpdatePdu {
    pub update_code: UpdateCode,
    pub fragmentation: Fragmentation,
    pub compression_flags: Option<u8>,
    pub data: Vec<u8>,
}

impl FastPathUpdatePdu {
    pub fn from_buffer(mut stream: impl io::Read) -> Result<Self, FastPathError> {
        let header = stream.read_u8()?;

        let update_code = UpdateCode::from_u8(header & UPDATE_CODE_MASK)
            .ok_or_else(|| FastPathError::InvalidUpdateCode(header & UPDATE_CODE_MASK))?;
        let fragmentation = Fragmentation::from_u8((header >> 4) & FRAGMENTATION_MASK)
            .expect("two bits always map to a fragmentation variant");

        let compression_flags = if (header >> 6) & COMPRESSION_USED != 0 {
            Some(stream.read_u8()?)
        } else {
            None
        };

        let size = stream.read_u16::<LittleEndian>()?;
        let mut data = vec![0; usize::from(size)];
        stream.read_exact(data.as_mut())?;

        Ok(Self {
            update_code,
            fragmentation,
            compression_flags,
            data,
        })
    }

    pub fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), FastPathError> {
        let mut header = self.update_code.to_u8().unwrap();
        header |= (self.fragmentation.to_u8().unwrap() & FRAGMENTATION_MASK) << 4;
        if self.compression_flags.is_some() {
            header |= COMPRESSION_USED << 6;
        }

        stream.write_u8(header)?;
        if let Some(compression_flags) = self.compression_flags {
            stream.write_u8(compression_flags)?;
        }
        stream.write_u16::<LittleEndian>(self.data.len() as u16)?;
        stream.write_all(self.data.as_ref())?;

        Ok(())
    }

    pub fn buffer_length(&self) -> usize {
        1 + if self.compression_flags.is_some() { 1 } else { 0 } + 2 + self.data.len()
    }
}

/// Writes a client-to-server FastPath input record around already-formatted
/// input event data.
pub fn write_fast_path_input(
    mut stream: impl io::Write,
    events_count: u8,
    events_data: &[u8],
) -> io::Result<()> {
    let header = FAST_PATH_INPUT_ACTION | ((events_count & 0x0F) << 2);

    // the length field covers the whole record, its own bytes included
    let short_length = 1 + per::sizeof_length(0) + events_data.len();
    let length = if short_length > 0x7f {
        1 + per::sizeof_length(0x80) + events_data.len()
    } else {
        short_length
    };

    stream.write_u8(header)?;
    per::write_length(&mut stream, length as u16)?;
    stream.write_all(events_data)?;

    Ok(())
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum UpdateCode {
    Orders = 0x0,
    Bitmap = 0x1,
    Palette = 0x2,
    Synchronize = 0x3,
    SurfaceCommands = 0x4,
    HiddenPointer = 0x5,
    DefaultPointer = 0x6,
    PositionPointer = 0x8,
    ColorPointer = 0x9,
    CachedPointer = 0xa,
    NewPointer = 0xb,
    LargePointer = 0xc,
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
pub enum Fragmentation {
    Single = 0x0,
    Last = 0x1,
    First = 0x2,
    Next = 0x3,
}

#[derive(Debug, Fail)]
pub enum FastPathError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "received a FastPath record with zero-sized payload")]
    NullLength { bytes_read: usize },
    #[fail(display = "invalid FastPath update code: 0x{:x}", _0)]
    InvalidUpdateCode(u8),
    #[fail(display = "FastPath update size does not fit the 16-bit size field")]
    SizeOverflow,
}

impl_from_error!(io::Error, FastPathError, FastPathError::IOError);
