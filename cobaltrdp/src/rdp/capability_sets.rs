#[cfg(test)]
mod tests;

mod bitmap;
mod bitmap_cache;
mod bitmap_codecs;
mod brush;
mod frame_acknowledge;
mod general;
mod glyph_cache;
mod input;
mod large_pointer;
mod multifragment_update;
mod offscreen_bitmap_cache;
mod order;
mod pointer;
mod sound;
mod surface_commands;
mod virtual_channel;

pub use self::bitmap::{Bitmap, BitmapDrawingFlags};
pub use self::bitmap_cache::{BitmapCache, CacheEntry, BITMAP_CACHE_ENTRIES_NUM};
pub use self::bitmap_codecs::{BitmapCodecs, Codec, Guid, CODEC_GUID_NSCODEC, CODEC_GUID_REMOTEFX};
pub use self::brush::{Brush, SupportLevel};
pub use self::frame_acknowledge::FrameAcknowledge;
pub use self::general::{General, GeneralExtraFlags, MajorPlatformType, MinorPlatformType};
pub use self::glyph_cache::{CacheDefinition, GlyphCache, GlyphSupportLevel, GLYPH_CACHE_NUM};
pub use self::input::{Input, InputFlags};
pub use self::large_pointer::{LargePointer, LargePointerSupportFlags};
pub use self::multifragment_update::MultifragmentUpdate;
pub use self::offscreen_bitmap_cache::OffscreenBitmapCache;
pub use self::order::{Order, OrderFlags};
pub use self::pointer::Pointer;
pub use self::sound::{Sound, SoundFlags};
pub use self::surface_commands::{CmdFlags, SurfaceCommands};
pub use self::virtual_channel::{VirtualChannel, VirtualChannelFlags};

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use crate::PduParsing;

const SOURCE_DESCRIPTOR_LENGTH_FIELD_SIZE: usize = 2;
const COMBINED_CAPABILITIES_LENGTH_FIELD_SIZE: usize = 2;
const NUMBER_CAPABILITIES_FIELD_SIZE: usize = 2;
const PADDING_SIZE: usize = 2;
const SESSION_ID_FIELD_SIZE: usize = 4;
const CAPABILITY_SET_HEADER_SIZE: usize = 4;
const ORIGINATOR_ID_FIELD_SIZE: usize = 2;

const NULL_TERMINATOR: &str = "\0";
const SERVER_CHANNEL_ID: u16 = 0x03ea;

/// TS_DEMAND_ACTIVE_PDU as the server sends it; the trailing session id is
/// ignored by clients.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerDemandActive {
    pub pdu: DemandActive,
}

impl PduParsing for ServerDemandActive {
    type Error = CapabilitySetsError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let pdu = DemandActive::from_buffer(&mut stream)?;
        // sessionId may be absent on some servers; it carries nothing anyway
        let _session_id = match stream.read_u32::<LittleEndian>() {
            Ok(session_id) => session_id,
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => 0,
            Err(e) => return Err(CapabilitySetsError::from(e)),
        };

        Ok(Self { pdu })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        self.pdu.to_buffer(&mut stream)?;
        stream.write_u32::<LittleEndian>(0)?; // session id

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        self.pdu.buffer_length() + SESSION_ID_FIELD_SIZE
    }
}

/// TS_CONFIRM_ACTIVE_PDU: the client's reply, addressed to the well-known
/// server channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfirmActive {
    pub pdu: DemandActive,
}

impl ClientConfirmActive {
    pub fn new(pdu: DemandActive) -> Self {
        Self { pdu }
    }
}

impl PduParsing for ClientConfirmActive {
    type Error = CapabilitySetsError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let originator_id = stream.read_u16::<LittleEndian>()?;
        if originator_id != SERVER_CHANNEL_ID {
            return Err(CapabilitySetsError::InvalidOriginatorId);
        }

        Ok(Self {
            pdu: DemandActive::from_buffer(&mut stream)?,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u16::<LittleEndian>(SERVER_CHANNEL_ID)?;

        self.pdu.to_buffer(&mut stream)
    }

    fn buffer_length(&self) -> usize {
        self.pdu.buffer_length() + ORIGINATOR_ID_FIELD_SIZE
    }
}

/// The shared body of Demand Active and Confirm Active: a source descriptor
/// and the ordered capability-set list.
#[derive(Debug, Clone, PartialEq)]
pub struct DemandActive {
    pub source_descriptor: String,
    pub capability_sets: Vec<CapabilitySet>,
}

impl DemandActive {
    pub fn new(source_descriptor: String, capability_sets: Vec<CapabilitySet>) -> Self {
        Self {
            source_descriptor,
            capability_sets,
        }
    }
}

impl PduParsing for DemandActive {
    type Error = CapabilitySetsError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let source_descriptor_length = usize::from(stream.read_u16::<LittleEndian>()?);
        // the combined size of the capability sets, their count and the padding
        let _combined_capabilities_length = usize::from(stream.read_u16::<LittleEndian>()?);

        let mut source_descriptor_buffer = vec![0; source_descriptor_length];
        stream.read_exact(source_descriptor_buffer.as_mut())?;
        let source_descriptor = String::from_utf8(source_descriptor_buffer)?
            .trim_end_matches(NULL_TERMINATOR)
            .to_string();

        let capability_sets_count = usize::from(stream.read_u16::<LittleEndian>()?);
        let _padding = stream.read_u16::<LittleEndian>()?;

        let mut capability_sets = Vec::with_capacity(capability_sets_count);
        for _ in 0..capability_sets_count {
            capability_sets.push(CapabilitySet::from_buffer(&mut stream)?);
        }

        Ok(Self {
            source_descriptor,
            capability_sets,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        let combined_length = self
            .capability_sets
            .iter()
            .map(PduParsing::buffer_length)
            .sum::<usize>()
            + NUMBER_CAPABILITIES_FIELD_SIZE
            + PADDING_SIZE;

        stream.write_u16::<LittleEndian>(
            (self.source_descriptor.len() + NULL_TERMINATOR.len()) as u16,
        )?;
        stream.write_u16::<LittleEndian>(combined_length as u16)?;
        stream.write_all(self.source_descriptor.as_ref())?;
        stream.write_all(NULL_TERMINATOR.as_bytes())?;
        stream.write_u16::<LittleEndian>(self.capability_sets.len() as u16)?;
        stream.write_u16::<LittleEndian>(0)?; // padding

        for capability_set in self.capability_sets.iter() {
            capability_set.to_buffer(&mut stream)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        SOURCE_DESCRIPTOR_LENGTH_FIELD_SIZE
            + COMBINED_CAPABILITIES_LENGTH_FIELD_SIZE
            + self.source_descriptor.len()
            + NULL_TERMINATOR.len()
            + NUMBER_CAPABILITIES_FIELD_SIZE
            + PADDING_SIZE
            + self
                .capability_sets
                .iter()
                .map(PduParsing::buffer_length)
                .sum::<usize>()
    }
}

/// One typed capability record. Sets without client-side logic keep their
/// body as an opaque byte record.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilitySet {
    General(General),
    Bitmap(Bitmap),
    Order(Order),
    BitmapCache(BitmapCache),
    Pointer(Pointer),
    Sound(Sound),
    Input(Input),
    Brush(Brush),
    GlyphCache(GlyphCache),
    OffscreenBitmapCache(OffscreenBitmapCache),
    VirtualChannel(VirtualChannel),
    SurfaceCommands(SurfaceCommands),
    BitmapCodecs(BitmapCodecs),
    MultifragmentUpdate(MultifragmentUpdate),
    LargePointer(LargePointer),
    FrameAcknowledge(FrameAcknowledge),

    // opaque sets
    Control(Vec<u8>),
    WindowActivation(Vec<u8>),
    Share(Vec<u8>),
    Font(Vec<u8>),
    ColorCache(Vec<u8>),
    BitmapCacheHostSupport(Vec<u8>),
    BitmapCacheRev2(Vec<u8>),
    DrawNineGridCache(Vec<u8>),
    DrawGdiPlus(Vec<u8>),
    Rail(Vec<u8>),
    WindowList(Vec<u8>),
    DesktopComposition(Vec<u8>),
}

impl PduParsing for CapabilitySet {
    type Error = CapabilitySetsError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let capability_set_type = CapabilitySetType::from_u16(stream.read_u16::<LittleEndian>()?)
            .ok_or(CapabilitySetsError::InvalidType)?;
        let length = usize::from(stream.read_u16::<LittleEndian>()?);

        if length < CAPABILITY_SET_HEADER_SIZE {
            return Err(CapabilitySetsError::InvalidLength);
        }

        let mut body = vec![0; length - CAPABILITY_SET_HEADER_SIZE];
        stream.read_exact(body.as_mut())?;
        let body = body.as_slice();

        match capability_set_type {
            CapabilitySetType::General => Ok(CapabilitySet::General(General::from_buffer(body)?)),
            CapabilitySetType::Bitmap => Ok(CapabilitySet::Bitmap(Bitmap::from_buffer(body)?)),
            CapabilitySetType::Order => Ok(CapabilitySet::Order(Order::from_buffer(body)?)),
            CapabilitySetType::BitmapCache => {
                Ok(CapabilitySet::BitmapCache(BitmapCache::from_buffer(body)?))
            }
            CapabilitySetType::Pointer => Ok(CapabilitySet::Pointer(Pointer::from_buffer(body)?)),
            CapabilitySetType::Sound => Ok(CapabilitySet::Sound(Sound::from_buffer(body)?)),
            CapabilitySetType::Input => Ok(CapabilitySet::Input(Input::from_buffer(body)?)),
            CapabilitySetType::Brush => Ok(CapabilitySet::Brush(Brush::from_buffer(body)?)),
            CapabilitySetType::GlyphCache => {
                Ok(CapabilitySet::GlyphCache(GlyphCache::from_buffer(body)?))
            }
            CapabilitySetType::OffscreenBitmapCache => Ok(CapabilitySet::OffscreenBitmapCache(
                OffscreenBitmapCache::from_buffer(body)?,
            )),
            CapabilitySetType::VirtualChannel => Ok(CapabilitySet::VirtualChannel(
                VirtualChannel::from_buffer(body)?,
            )),
            CapabilitySetType::SurfaceCommands => Ok(CapabilitySet::SurfaceCommands(
                SurfaceCommands::from_buffer(body)?,
            )),
            CapabilitySetType::BitmapCodecs => Ok(CapabilitySet::BitmapCodecs(
                BitmapCodecs::from_buffer(body)?,
            )),
            CapabilitySetType::MultifragmentUpdate => Ok(CapabilitySet::MultifragmentUpdate(
                MultifragmentUpdate::from_buffer(body)?,
            )),
            CapabilitySetType::LargePointer => Ok(CapabilitySet::LargePointer(
                LargePointer::from_buffer(body)?,
            )),
            CapabilitySetType::FrameAcknowledge => Ok(CapabilitySet::FrameAcknowledge(
                FrameAcknowledge::from_buffer(body)?,
            )),
            CapabilitySetType::Control => Ok(CapabilitySet::Control(body.to_vec())),
            CapabilitySetType::WindowActivation => {
                Ok(CapabilitySet::WindowActivation(body.to_vec()))
            }
            CapabilitySetType::Share => Ok(CapabilitySet::Share(body.to_vec())),
            CapabilitySetType::Font => Ok(CapabilitySet::Font(body.to_vec())),
            CapabilitySetType::ColorCache => Ok(CapabilitySet::ColorCache(body.to_vec())),
            CapabilitySetType::BitmapCacheHostSupport => {
                Ok(CapabilitySet::BitmapCacheHostSupport(body.to_vec()))
            }
            CapabilitySetType::BitmapCacheRev2 => {
                Ok(CapabilitySet::BitmapCacheRev2(body.to_vec()))
            }
            CapabilitySetType::DrawNineGridCache => {
                Ok(CapabilitySet::DrawNineGridCache(body.to_vec()))
            }
            CapabilitySetType::DrawGdiPlus => Ok(CapabilitySet::DrawGdiPlus(body.to_vec())),
            CapabilitySetType::Rail => Ok(CapabilitySet::Rail(body.to_vec())),
            CapabilitySetType::WindowList => Ok(CapabilitySet::WindowList(body.to_vec())),
            CapabilitySetType::DesktopComposition => {
                Ok(CapabilitySet::DesktopComposition(body.to_vec()))
            }
        }
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u16::<LittleEndian>(self.capability_set_type().to_u16().unwrap())?;
        stream.write_u16::<LittleEndian>(self.buffer_length() as u16)?;

        match self {
            CapabilitySet::General(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::Bitmap(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::Order(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::BitmapCache(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::Pointer(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::Sound(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::Input(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::Brush(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::GlyphCache(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::OffscreenBitmapCache(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::VirtualChannel(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::SurfaceCommands(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::BitmapCodecs(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::MultifragmentUpdate(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::LargePointer(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::FrameAcknowledge(capset) => capset.to_buffer(&mut stream),
            CapabilitySet::Control(buffer)
            | CapabilitySet::WindowActivation(buffer)
            | CapabilitySet::Share(buffer)
            | CapabilitySet::Font(buffer)
            | CapabilitySet::ColorCache(buffer)
            | CapabilitySet::BitmapCacheHostSupport(buffer)
            | CapabilitySet::BitmapCacheRev2(buffer)
            | CapabilitySet::DrawNineGridCache(buffer)
            | CapabilitySet::DrawGdiPlus(buffer)
            | CapabilitySet::Rail(buffer)
            | CapabilitySet::WindowList(buffer)
            | CapabilitySet::DesktopComposition(buffer) => {
                stream.write_all(buffer)?;

                Ok(())
            }
        }
    }

    fn buffer_length(&self) -> usize {
        CAPABILITY_SET_HEADER_SIZE
            + match self {
                CapabilitySet::General(capset) => capset.buffer_length(),
                CapabilitySet::Bitmap(capset) => capset.buffer_length(),
                CapabilitySet::Order(capset) => capset.buffer_length(),
                CapabilitySet::BitmapCache(capset) => capset.buffer_length(),
                CapabilitySet::Pointer(capset) => capset.buffer_length(),
                CapabilitySet::Sound(capset) => capset.buffer_length(),
                CapabilitySet::Input(capset) => capset.buffer_length(),
                CapabilitySet::Brush(capset) => capset.buffer_length(),
                CapabilitySet::GlyphCache(capset) => capset.buffer_length(),
                CapabilitySet::OffscreenBitmapCache(capset) => capset.buffer_length(),
                CapabilitySet::VirtualChannel(capset) => capset.buffer_length(),
                CapabilitySet::SurfaceCommands(capset) => capset.buffer_length(),
                CapabilitySet::BitmapCodecs(capset) => capset.buffer_length(),
                CapabilitySet::MultifragmentUpdate(capset) => capset.buffer_length(),
                CapabilitySet::LargePointer(capset) => capset.buffer_length(),
                CapabilitySet::FrameAcknowledge(capset) => capset.buffer_length(),
                CapabilitySet::Control(buffer)
                | CapabilitySet::WindowActivation(buffer)
                | CapabilitySet::Share(buffer)
                | CapabilitySet::Font(buffer)
                | CapabilitySet::ColorCache(buffer)
                | CapabilitySet::BitmapCacheHostSupport(buffer)
                | CapabilitySet::BitmapCacheRev2(buffer)
                | CapabilitySet::DrawNineGridCache(buffer)
                | CapabilitySet::DrawGdiPlus(buffer)
                | CapabilitySet::Rail(buffer)
                | CapabilitySet::WindowList(buffer)
                | CapabilitySet::DesktopComposition(buffer) => buffer.len(),
            }
    }
}

impl CapabilitySet {
    fn capability_set_type(&self) -> CapabilitySetType {
        match self {
            CapabilitySet::General(_) => CapabilitySetType::General,
            CapabilitySet::Bitmap(_) => CapabilitySetType::Bitmap,
            CapabilitySet::Order(_) => CapabilitySetType::Order,
            CapabilitySet::BitmapCache(_) => CapabilitySetType::BitmapCache,
            CapabilitySet::Pointer(_) => CapabilitySetType::Pointer,
            CapabilitySet::Sound(_) => CapabilitySetType::Sound,
            CapabilitySet::Input(_) => CapabilitySetType::Input,
            CapabilitySet::Brush(_) => CapabilitySetType::Brush,
            CapabilitySet::GlyphCache(_) => CapabilitySetType::GlyphCache,
            CapabilitySet::OffscreenBitmapCache(_) => CapabilitySetType::OffscreenBitmapCache,
            CapabilitySet::VirtualChannel(_) => CapabilitySetType::VirtualChannel,
            CapabilitySet::SurfaceCommands(_) => CapabilitySetType::SurfaceCommands,
            CapabilitySet::BitmapCodecs(_) => CapabilitySetType::BitmapCodecs,
            CapabilitySet::MultifragmentUpdate(_) => CapabilitySetType::MultifragmentUpdate,
            CapabilitySet::LargePointer(_) => CapabilitySetType::LargePointer,
            CapabilitySet::FrameAcknowledge(_) => CapabilitySetType::FrameAcknowledge,
            CapabilitySet::Control(_) => CapabilitySetType::Control,
            CapabilitySet::WindowActivation(_) => CapabilitySetType::WindowActivation,
            CapabilitySet::Share(_) => CapabilitySetType::Share,
            CapabilitySet::Font(_) => CapabilitySetType::Font,
            CapabilitySet::ColorCache(_) => CapabilitySetType::ColorCache,
            CapabilitySet::BitmapCacheHostSupport(_) => CapabilitySetType::BitmapCacheHostSupport,
            CapabilitySet::BitmapCacheRev2(_) => CapabilitySetType::BitmapCacheRev2,
            CapabilitySet::DrawNineGridCache(_) => CapabilitySetType::DrawNineGridCache,
            CapabilitySet::DrawGdiPlus(_) => CapabilitySetType::DrawGdiPlus,
            CapabilitySet::Rail(_) => CapabilitySetType::Rail,
            CapabilitySet::WindowList(_) => CapabilitySetType::WindowList,
            CapabilitySet::DesktopComposition(_) => CapabilitySetType::DesktopComposition,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive, ToPrimitive)]
enum CapabilitySetType {
    General = 0x01,
    Bitmap = 0x02,
    Order = 0x03,
    BitmapCache = 0x04,
    Control = 0x05,
    WindowActivation = 0x07,
    Pointer = 0x08,
    Share = 0x09,
    ColorCache = 0x0a,
    Sound = 0x0c,
    Input = 0x0d,
    Font = 0x0e,
    Brush = 0x0f,
    GlyphCache = 0x10,
    OffscreenBitmapCache = 0x11,
    BitmapCacheHostSupport = 0x12,
    BitmapCacheRev2 = 0x13,
    VirtualChannel = 0x14,
    DrawNineGridCache = 0x15,
    DrawGdiPlus = 0x16,
    Rail = 0x17,
    WindowList = 0x18,
    DesktopComposition = 0x19,
    MultifragmentUpdate = 0x1a,
    LargePointer = 0x1b,
    SurfaceCommands = 0x1c,
    BitmapCodecs = 0x1d,
    FrameAcknowledge = 0x1e,
}

#[derive(Debug, Fail)]
pub enum CapabilitySetsError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "UTF-8 error: {}", _0)]
    Utf8Error(#[fail(cause)] std::string::FromUtf8Error),
    #[fail(display = "invalid capability set type field")]
    InvalidType,
    #[fail(display = "invalid capability set length field")]
    InvalidLength,
    #[fail(display = "invalid originator ID field")]
    InvalidOriginatorId,
    #[fail(display = "invalid bitmap compression field")]
    InvalidCompressionFlag,
    #[fail(display = "invalid multiple rectangle support field")]
    InvalidMultipleRectSupport,
    #[fail(display = "invalid major platform type field")]
    InvalidMajorPlatformType,
    #[fail(display = "invalid minor platform type field")]
    InvalidMinorPlatformType,
    #[fail(display = "invalid protocol version field")]
    InvalidProtocolVersion,
    #[fail(display = "invalid brush support level field")]
    InvalidBrushSupportLevel,
    #[fail(display = "invalid glyph support level field")]
    InvalidGlyphSupportLevel,
    #[fail(display = "invalid codec ID")]
    InvalidCodecId,
}

impl_from_error!(io::Error, CapabilitySetsError, CapabilitySetsError::IOError);

impl From<std::string::FromUtf8Error> for CapabilitySetsError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        CapabilitySetsError::Utf8Error(e)
    }
}
