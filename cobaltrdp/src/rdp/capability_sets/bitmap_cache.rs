use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::rdp::CapabilitySetsError;
use crate::PduParsing;

pub const BITMAP_CACHE_ENTRIES_NUM: usize = 3;

const BITMAP_CACHE_LENGTH: usize = 36;
const PADDING_U32_COUNT: usize = 6;

/// TS_BITMAPCACHE_CAPABILITYSET (revision 1). The client advertises empty
/// caches since it never draws from them.
#[derive(Debug, PartialEq, Clone)]
pub struct BitmapCache {
    pub caches: [CacheEntry; BITMAP_CACHE_ENTRIES_NUM],
}

impl PduParsing for BitmapCache {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        for _ in 0..PADDING_U32_COUNT {
            let _padding = buffer.read_u32::<LittleEndian>()?;
        }

        let mut caches = [CacheEntry::default(); BITMAP_CACHE_ENTRIES_NUM];
        for cache in caches.iter_mut() {
            *cache = CacheEntry::from_buffer(&mut buffer)?;
        }

        Ok(Self { caches })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        for _ in 0..PADDING_U32_COUNT {
            buffer.write_u32::<LittleEndian>(0)?;
        }

        for cache in self.caches.iter() {
            cache.to_buffer(&mut buffer)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        BITMAP_CACHE_LENGTH
    }
}

#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub struct CacheEntry {
    pub entries: u16,
    pub max_cell_size: u16,
}

impl PduParsing for CacheEntry {
    type Error = CapabilitySetsError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let entries = buffer.read_u16::<LittleEndian>()?;
        let max_cell_size = buffer.read_u16::<LittleEndian>()?;

        Ok(Self {
            entries,
            max_cell_size,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u16::<LittleEndian>(self.entries)?;
        buffer.write_u16::<LittleEndian>(self.max_cell_size)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        4
    }
}
