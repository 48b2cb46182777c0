use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::PduParsing;

const NUMBER_OF_AREAS_SIZE: usize = 1;
const PADDING_SIZE: usize = 3;
const RECTANGLE_SIZE: usize = 8;

/// TS_REFRESH_RECT_PDU: asks the server to repaint screen areas. Support is
/// advertised in the general capability set, so sending it stays best-effort.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshRectanglePdu {
    pub areas_to_refresh: Vec<InclusiveRectangle>,
}

impl RefreshRectanglePdu {
    /// A full-desktop repaint request. Zero-sized desktops clamp to a
    /// zero-sized inclusive rectangle instead of underflowing.
    pub fn full_screen(desktop_width: u16, desktop_height: u16) -> Self {
        Self {
            areas_to_refresh: vec![InclusiveRectangle {
                left: 0,
                top: 0,
                right: desktop_width.saturating_sub(1),
                bottom: desktop_height.saturating_sub(1),
            }],
        }
    }
}

impl PduParsing for RefreshRectanglePdu {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let number_of_areas = stream.read_u8()?;
        let mut padding = [0; PADDING_SIZE];
        stream.read_exact(padding.as_mut())?;

        let mut areas_to_refresh = Vec::with_capacity(usize::from(number_of_areas));
        for _ in 0..number_of_areas {
            areas_to_refresh.push(InclusiveRectangle::from_buffer(&mut stream)?);
        }

        Ok(Self { areas_to_refresh })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u8(self.areas_to_refresh.len() as u8)?;
        stream.write_all(&[0; PADDING_SIZE])?;

        for rectangle in self.areas_to_refresh.iter() {
            rectangle.to_buffer(&mut stream)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        NUMBER_OF_AREAS_SIZE + PADDING_SIZE + self.areas_to_refresh.len() * RECTANGLE_SIZE
    }
}

/// TS_RECTANGLE16 with inclusive right and bottom edges.
#[derive(Debug, Clone, PartialEq)]
pub struct InclusiveRectangle {
    pub left: u16,
    pub top: u16,
    pub right: u16,
    pub bottom: u16,
}

impl PduParsing for InclusiveRectangle {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let left = stream.read_u16::<LittleEndian>()?;
        let top = stream.read_u16::<LittleEndian>()?;
        let right = stream.read_u16::<LittleEndian>()?;
        let bottom = stream.read_u16::<LittleEndian>()?;

        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u16::<LittleEndian>(self.left)?;
        stream.write_u16::<LittleEndian>(self.top)?;
        stream.write_u16::<LittleEndian>(self.right)?;
        stream.write_u16::<LittleEndian>(self.bottom)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        RECTANGLE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_screen_request_round_trips() {
        let pdu = RefreshRectanglePdu::full_screen(1280, 720);

        let mut buffer = Vec::new();
        pdu.to_buffer(&mut buffer).unwrap();
        assert_eq!(pdu.buffer_length(), buffer.len());

        assert_eq!(
            pdu,
            RefreshRectanglePdu::from_buffer(buffer.as_slice()).unwrap()
        );
    }

    #[test]
    fn zero_sized_desktop_clamps_instead_of_underflowing() {
        let pdu = RefreshRectanglePdu::full_screen(0, 0);

        assert_eq!(0, pdu.areas_to_refresh[0].right);
        assert_eq!(0, pdu.areas_to_refresh[0].bottom);
    }
}
