mod active_session;
mod config;
mod connection_sequence;
mod rail;
mod session;
mod transport;

pub use crate::active_session::{ChannelDataHandler, SessionEvent, UpdateFrame};
pub use crate::config::{RemoteApp, SessionConfig};
pub use crate::session::RdpSession;

use std::io;

use cobaltrdp::fast_path::FastPathError;
use cobaltrdp::gcc::GccError;
use cobaltrdp::nego::NegotiationError;
use cobaltrdp::sspi::SspiError;
use cobaltrdp::{rdp, McsError};
use failure::Fail;

pub type RdpResult<T> = Result<T, RdpError>;

/// Every way an RDP session can fail, tagged with the phase that failed so
/// the caller knows what to do about it.
#[derive(Debug, Fail)]
pub enum RdpError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "connection error: {}", _0)]
    ConnectionError(#[fail(cause)] io::Error),
    #[fail(display = "negotiation error: {}", _0)]
    NegotiationError(#[fail(cause)] NegotiationError),
    #[fail(display = "TLS connector error: {}", _0)]
    TlsConnectorError(native_tls::Error),
    #[fail(display = "TLS handshake error: {}", _0)]
    TlsHandshakeError(native_tls::Error),
    #[fail(display = "missing peer certificate")]
    MissingPeerCertificate,
    #[fail(display = "failed to extract the peer public key: {}", _0)]
    InvalidPeerCertificate(String),
    #[fail(display = "CredSSP error: {}", _0)]
    CredSspError(#[fail(cause)] SspiError),
    #[fail(display = "CredSSP TSRequest error: {}", _0)]
    TsRequestError(#[fail(cause)] io::Error),
    #[fail(display = "Early User Authorization Result error: {}", _0)]
    EarlyUserAuthResultError(#[fail(cause)] io::Error),
    #[fail(display = "the server denied access via Early User Authorization Result")]
    AccessDenied,
    #[fail(display = "basic settings exchange: MCS connect error: {}", _0)]
    McsConnectError(#[fail(cause)] McsError),
    #[fail(display = "basic settings exchange: user data error: {}", _0)]
    UserDataError(#[fail(cause)] GccError),
    #[fail(display = "channel connection: MCS error: {}", _0)]
    McsError(#[fail(cause)] McsError),
    #[fail(display = "secure settings exchange: {}", _0)]
    ClientInfoError(rdp::RdpError),
    #[fail(display = "licensing: {}", _0)]
    ServerLicenseError(rdp::RdpError),
    #[fail(
        display = "licensing: the server did not send its license packet in time; \
                   the credentials may be wrong, or an XRDP server may be waiting \
                   for a channel join that never happened"
    )]
    LicensingTimeout,
    #[fail(display = "capabilities exchange: {}", _0)]
    CapabilitySetsError(rdp::RdpError),
    #[fail(display = "finalization: {}", _0)]
    FinalizationError(rdp::RdpError),
    #[fail(display = "share control error: {}", _0)]
    ShareControlError(rdp::RdpError),
    #[fail(display = "FastPath error: {}", _0)]
    FastPathError(#[fail(cause)] FastPathError),
    #[fail(display = "unexpected PDU: {}", _0)]
    UnexpectedPdu(String),
    #[fail(display = "invalid response: {}", _0)]
    InvalidResponse(String),
    #[fail(display = "the server disconnected: {}", _0)]
    UnexpectedDisconnection(String),
    #[fail(display = "data arrived on unexpected channel {}", _0)]
    UnexpectedChannel(u16),
    #[fail(display = "the server selected the unsupported protocol {:?}", _0)]
    UnsupportedSecurityProtocol(cobaltrdp::SecurityProtocol),
    #[fail(display = "the session is not connected")]
    NotConnected,
    #[fail(display = "the session is already connected")]
    AlreadyConnected,
}

impl From<io::Error> for RdpError {
    fn from(e: io::Error) -> Self {
        RdpError::IOError(e)
    }
}

impl From<NegotiationError> for RdpError {
    fn from(e: NegotiationError) -> Self {
        RdpError::NegotiationError(e)
    }
}

impl From<McsError> for RdpError {
    fn from(e: McsError) -> Self {
        RdpError::McsError(e)
    }
}

impl From<SspiError> for RdpError {
    fn from(e: SspiError) -> Self {
        RdpError::CredSspError(e)
    }
}

impl From<FastPathError> for RdpError {
    fn from(e: FastPathError) -> Self {
        RdpError::FastPathError(e)
    }
}
