#[macro_use]
mod utils;

pub mod ber;
pub mod credssp;
pub mod crypto;
pub mod fast_path;
pub mod gcc;
pub mod mcs;
pub mod nego;
pub mod ntlm;
pub mod per;
pub mod rdp;
pub mod sspi;
pub mod x224;

pub use crate::{
    fast_path::{FastPathError, FastPathHeader, FastPathUpdatePdu},
    mcs::{ConnectInitial, ConnectResponse, McsError, McsPdu, SendDataContext},
    nego::{NegoData, NegotiationError, SecurityProtocol},
    rdp::{
        CapabilitySet, ClientConfirmActive, ClientInfoPdu, ControlAction, DemandActive,
        ServerDemandActive, ServerLicensePdu, ShareControlHeader, ShareControlPdu, ShareDataHeader,
        ShareDataPdu,
    },
    sspi::Credentials,
    x224::{TpktHeader, X224TPDUType, TPKT_HEADER_LENGTH},
};

/// The codec contract every PDU in the crate fulfills: parse from a byte
/// stream, serialize into a byte stream, and report the exact serialized size.
pub trait PduParsing {
    type Error;

    fn from_buffer(stream: impl std::io::Read) -> Result<Self, Self::Error>
    where
        Self: std::marker::Sized;
    fn to_buffer(&self, stream: impl std::io::Write) -> Result<(), Self::Error>;
    fn buffer_length(&self) -> usize;
}
