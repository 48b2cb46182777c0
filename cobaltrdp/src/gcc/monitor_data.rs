use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;

use crate::PduParsing;

pub const MONITOR_COUNT_SIZE: usize = 4;
pub const MONITOR_SIZE: usize = 20;

const MONITOR_COUNT_MAX: usize = 16;
const MONITOR_FLAGS_SIZE: usize = 4;

const MONITOR_WIDTH_MIN: i32 = 200;
const MONITOR_WIDTH_MAX: i32 = 8192;

/// TS_UD_CS_MONITOR.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientMonitorData {
    pub monitors: Vec<Monitor>,
}

impl PduParsing for ClientMonitorData {
    type Error = MonitorDataError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let _flags = buffer.read_u32::<LittleEndian>()?; // unused
        let monitor_count = buffer.read_u32::<LittleEndian>()?;

        if monitor_count > MONITOR_COUNT_MAX as u32 {
            return Err(MonitorDataError::InvalidMonitorCount);
        }

        let mut monitors = Vec::with_capacity(monitor_count as usize);
        for _ in 0..monitor_count {
            monitors.push(Monitor::from_buffer(&mut buffer)?);
        }

        Ok(Self { monitors })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u32::<LittleEndian>(0)?; // flags
        buffer.write_u32::<LittleEndian>(self.monitors.len() as u32)?;

        for monitor in self.monitors.iter().take(MONITOR_COUNT_MAX) {
            monitor.to_buffer(&mut buffer)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        MONITOR_FLAGS_SIZE + MONITOR_COUNT_SIZE + self.monitors.len() * MONITOR_SIZE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub flags: MonitorFlags,
}

impl Monitor {
    /// Builds the primary monitor rectangle for a desktop of the given size.
    /// The width is forced even and kept inside the range servers accept.
    pub fn primary(desktop_width: u16, desktop_height: u16) -> Self {
        let width = (i32::from(desktop_width) & !1).clamp(MONITOR_WIDTH_MIN, MONITOR_WIDTH_MAX);

        Self {
            left: 0,
            top: 0,
            right: width - 1,
            bottom: i32::from(desktop_height).max(1) - 1,
            flags: MonitorFlags::PRIMARY,
        }
    }
}

impl PduParsing for Monitor {
    type Error = MonitorDataError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let left = buffer.read_i32::<LittleEndian>()?;
        let top = buffer.read_i32::<LittleEndian>()?;
        let right = buffer.read_i32::<LittleEndian>()?;
        let bottom = buffer.read_i32::<LittleEndian>()?;
        let flags = MonitorFlags::from_bits(buffer.read_u32::<LittleEndian>()?)
            .ok_or(MonitorDataError::InvalidMonitorFlags)?;

        Ok(Self {
            left,
            top,
            right,
            bottom,
            flags,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_i32::<LittleEndian>(self.left)?;
        buffer.write_i32::<LittleEndian>(self.top)?;
        buffer.write_i32::<LittleEndian>(self.right)?;
        buffer.write_i32::<LittleEndian>(self.bottom)?;
        buffer.write_u32::<LittleEndian>(self.flags.bits())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        MONITOR_SIZE
    }
}

bitflags! {
    pub struct MonitorFlags: u32 {
        const PRIMARY = 1;
    }
}

#[derive(Debug, Fail)]
pub enum MonitorDataError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "invalid monitor count field")]
    InvalidMonitorCount,
    #[fail(display = "invalid monitor flags field")]
    InvalidMonitorFlags,
}

impl_from_error!(io::Error, MonitorDataError, MonitorDataError::IOError);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_monitor_width_is_rounded_even_and_clamped() {
        assert_eq!(1919, Monitor::primary(1921, 1080).right);
        assert_eq!(200 - 1, Monitor::primary(64, 64).right);
        assert_eq!(200 - 1, Monitor::primary(0, 0).right);
        assert_eq!(8192 - 1, Monitor::primary(u16::max_value(), 1).right);
    }

    #[test]
    fn primary_monitor_height_never_underflows() {
        assert_eq!(0, Monitor::primary(800, 0).bottom);
    }

    #[test]
    fn monitor_data_round_trips() {
        let data = ClientMonitorData {
            monitors: vec![Monitor::primary(1920, 1080)],
        };

        let mut buffer = Vec::new();
        data.to_buffer(&mut buffer).unwrap();
        assert_eq!(data.buffer_length(), buffer.len());

        assert_eq!(data, ClientMonitorData::from_buffer(buffer.as_slice()).unwrap());
    }
}
