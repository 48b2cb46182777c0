use std::io;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

const CODEC_COUNT_SIZE: usize = 1;
const CODEC_HEADER_SIZE: usize = GUID_SIZE + 1 + 2;
const GUID_SIZE: usize = 16;

pub const CODEC_GUID_NSCODEC: Guid = Guid {
    data1: 0xca8d_1bb9,
    data2: 0x000f,
    data3: 0x154f,
    data4: [0x58, 0x9f, 0xae, 0x2d, 0x1a, 0x87, 0xe2, 0xd6],
};

pub const CODEC_GUID_REMOTEFX: Guid = Guid {
    data1: 0x7677_2f12,
    data2: 0xbd72,
    data3: 0x4463,
    data4: [0xaf, 0xb3, 0xb7, 0x3c, 0x9c, 0x6f, 0x78, 0x86],
};

/// A codec GUID in the Microsoft wire layout: Data1..Data3 little-endian,
/// Data4 as-is.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl PduParsing for Guid {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let data1 = buffer.read_u32::<LittleEndian>()?;
        let data2 = buffer.read_u16::<LittleEndian>()?;
        let data3 = buffer.read_u16::<LittleEndian>()?;
        let mut data4 = [0; 8];
        buffer.read_exact(data4.as_mut())?;

        Ok(Self {
            data1,
            data2,
            data3,
            data4,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u32::<LittleEndian>(self.data1)?;
        buffer.write_u16::<LittleEndian>(self.data2)?;
        buffer.write_u16::<LittleEndian>(self.data3)?;
        // Data4 keeps its big-endian byte order on the wire
        buffer.write_u64::<BigEndian>(u64::from_be_bytes(self.data4))?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        GUID_SIZE
    }
}

/// TS_BITMAPCODECS_CAPABILITYSET: the codecs the peer can decode, each a GUID
/// plus an opaque property blob. The client only inspects the GUIDs.
#[derive(Debug, PartialEq, Clone)]
pub struct BitmapCodecs(pub Vec<Codec>);

impl BitmapCodecs {
    pub fn supports_remote_fx(&self) -> bool {
        self.0.iter().any(|codec| codec.guid == CODEC_GUID_REMOTEFX)
    }

    pub fn supports_ns_codec(&self) -> bool {
        self.0.iter().any(|codec| codec.guid == CODEC_GUID_NSCODEC)
    }
}

impl PduParsing for BitmapCodecs {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let codecs_count = buffer.read_u8()?;

        let mut codecs = Vec::with_capacity(usize::from(codecs_count));
        for _ in 0..codecs_count {
            codecs.push(Codec::from_buffer(&mut buffer)?);
        }

        Ok(Self(codecs))
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u8(self.0.len() as u8)?;

        for codec in self.0.iter() {
            codec.to_buffer(&mut buffer)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        CODEC_COUNT_SIZE
            + self
                .0
                .iter()
                .map(PduParsing::buffer_length)
                .sum::<usize>()
    }
}

/// TS_BITMAPCODEC. The id is how surface commands refer back to the codec.
#[derive(Debug, PartialEq, Clone)]
pub struct Codec {
    pub guid: Guid,
    pub id: u8,
    pub properties: Vec<u8>,
}

impl PduParsing for Codec {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let guid = Guid::from_buffer(&mut buffer)?;
        let id = buffer.read_u8()?;
        let properties_length = usize::from(buffer.read_u16::<LittleEndian>()?);

        let mut properties = vec![0; properties_length];
        buffer.read_exact(properties.as_mut())?;

        Ok(Self {
            guid,
            id,
            properties,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        self.guid.to_buffer(&mut buffer)?;
        buffer.write_u8(self.id)?;
        buffer.write_u16::<LittleEndian>(self.properties.len() as u16)?;
        buffer.write_all(self.properties.as_ref())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        CODEC_HEADER_SIZE + self.properties.len()
    }
}
