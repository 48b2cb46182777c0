pub mod client;
pub mod server;

use std::io;

use failure::Fail;

const VERSION_SIZE: usize = 4;

/// The RDP version advertised in the core data blocks. Kept as a plain
/// newtype: servers routinely report values newer than the client knows.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdpVersion(pub u32);

impl RdpVersion {
    pub const V4: Self = Self(0x0008_0001);
    pub const V5_PLUS: Self = Self(0x0008_0004);
    pub const V10: Self = Self(0x0008_0005);
}

impl From<u32> for RdpVersion {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<RdpVersion> for u32 {
    fn from(version: RdpVersion) -> Self {
        version.0
    }
}

#[derive(Debug, Fail)]
pub enum CoreDataError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "invalid color depth field")]
    InvalidColorDepth,
    #[fail(display = "invalid post beta color depth field")]
    InvalidPostBetaColorDepth,
    #[fail(display = "invalid high color depth field")]
    InvalidHighColorDepth,
    #[fail(display = "invalid supported color depths field")]
    InvalidSupportedColorDepths,
    #[fail(display = "invalid secure access sequence field")]
    InvalidSecureAccessSequence,
    #[fail(display = "invalid keyboard type field")]
    InvalidKeyboardType,
    #[fail(display = "invalid early capability flags field")]
    InvalidEarlyCapabilityFlags,
    #[fail(display = "invalid connection type field")]
    InvalidConnectionType,
    #[fail(display = "invalid server security protocol field")]
    InvalidServerSecurityProtocol,
}

impl_from_error!(io::Error, CoreDataError, CoreDataError::IOError);
