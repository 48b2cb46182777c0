#[cfg(test)]
mod tests;

pub mod capability_sets;
pub mod client_info;
pub mod finalization_messages;
pub mod headers;
pub mod refresh_rectangle;
pub mod server_error_info;
pub mod server_license;
pub mod vc;

pub use self::capability_sets::{
    CapabilitySet, CapabilitySetsError, ClientConfirmActive, DemandActive, ServerDemandActive,
};
pub use self::client_info::{ClientInfo, ClientInfoError, ClientInfoFlags};
pub use self::finalization_messages::ControlAction;
pub use self::headers::{
    BasicSecurityHeader, BasicSecurityHeaderFlags, DeactivateAllPdu, FrameAcknowledgePdu,
    ShareControlHeader, ShareControlPdu, ShareDataHeader, ShareDataPdu, SlowPathUpdateType,
    UpdatePdu,
};
pub use self::server_license::{ServerLicense, ServerLicenseError};

use std::io;

use failure::Fail;

use self::finalization_messages::FinalizationMessagesError;
use self::headers::{ShareControlPduType, ShareDataPduType};
use self::server_error_info::ServerErrorInfoError;
use crate::PduParsing;

/// Client Info PDU of the secure settings exchange. The basic security header
/// precedes it only when standard RDP security is in force; under Enhanced
/// RDP Security the TLS layer already covers it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInfoPdu {
    pub security_header: Option<BasicSecurityHeader>,
    pub client_info: ClientInfo,
}

impl ClientInfoPdu {
    pub fn new(client_info: ClientInfo, enhanced_security: bool) -> Self {
        let security_header = if enhanced_security {
            None
        } else {
            Some(BasicSecurityHeader::new(BasicSecurityHeaderFlags::INFO_PKT))
        };

        Self {
            security_header,
            client_info,
        }
    }

    pub fn from_buffer(
        mut stream: impl io::Read,
        enhanced_security: bool,
    ) -> Result<Self, RdpError> {
        let security_header = if enhanced_security {
            None
        } else {
            let security_header = BasicSecurityHeader::from_buffer(&mut stream)?;
            if !security_header
                .flags
                .contains(BasicSecurityHeaderFlags::INFO_PKT)
            {
                return Err(RdpError::InvalidPdu(String::from(
                    "expected the Client Info PDU, got invalid security header flags",
                )));
            }

            Some(security_header)
        };

        let client_info = ClientInfo::from_buffer(&mut stream)?;

        Ok(Self {
            security_header,
            client_info,
        })
    }

    pub fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), RdpError> {
        if let Some(ref security_header) = self.security_header {
            security_header.to_buffer(&mut stream)?;
        }
        self.client_info.to_buffer(&mut stream)?;

        Ok(())
    }

    pub fn buffer_length(&self) -> usize {
        self.security_header
            .as_ref()
            .map(PduParsing::buffer_length)
            .unwrap_or(0)
            + self.client_info.buffer_length()
    }
}

/// The server license packet, the one PDU that keeps its basic security
/// header even under Enhanced RDP Security.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerLicensePdu {
    pub security_header: BasicSecurityHeader,
    pub server_license: ServerLicense,
}

impl PduParsing for ServerLicensePdu {
    type Error = RdpError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let security_header = BasicSecurityHeader::from_buffer(&mut stream)?;
        if !security_header
            .flags
            .contains(BasicSecurityHeaderFlags::LICENSE_PKT)
        {
            return Err(RdpError::InvalidPdu(String::from(
                "expected the Server License PDU, got invalid security header flags",
            )));
        }

        let server_license = ServerLicense::from_buffer(&mut stream)?;

        Ok(Self {
            security_header,
            server_license,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        self.security_header.to_buffer(&mut stream)?;
        self.server_license.to_buffer(&mut stream)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        self.security_header.buffer_length() + self.server_license.buffer_length()
    }
}

#[derive(Debug, Fail)]
pub enum RdpError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "Client Info PDU error: {}", _0)]
    ClientInfoError(ClientInfoError),
    #[fail(display = "Server License PDU error: {}", _0)]
    ServerLicenseError(ServerLicenseError),
    #[fail(display = "capability sets error: {}", _0)]
    CapabilitySetsError(CapabilitySetsError),
    #[fail(display = "finalization PDUs error: {}", _0)]
    FinalizationMessagesError(FinalizationMessagesError),
    #[fail(display = "server error info PDU error: {}", _0)]
    ServerErrorInfoError(ServerErrorInfoError),
    #[fail(display = "invalid RDP security header")]
    InvalidSecurityHeader,
    #[fail(display = "invalid RDP share control header: {}", _0)]
    InvalidShareControlHeader(String),
    #[fail(display = "invalid RDP share data header: {}", _0)]
    InvalidShareDataHeader(String),
    #[fail(display = "invalid RDP connection sequence PDU: {}", _0)]
    InvalidPdu(String),
    #[fail(display = "unexpected share control PDU type: {:?}", _0)]
    UnexpectedShareControlPdu(ShareControlPduType),
    #[fail(display = "unexpected share data PDU type: {:?}", _0)]
    UnexpectedShareDataPdu(ShareDataPduType),
}

impl_from_error!(io::Error, RdpError, RdpError::IOError);
impl_from_error!(ClientInfoError, RdpError, RdpError::ClientInfoError);
impl_from_error!(ServerLicenseError, RdpError, RdpError::ServerLicenseError);
impl_from_error!(CapabilitySetsError, RdpError, RdpError::CapabilitySetsError);
impl_from_error!(
    FinalizationMessagesError,
    RdpError,
    RdpError::FinalizationMessagesError
);
impl_from_error!(
    ServerErrorInfoError,
    RdpError,
    RdpError::ServerErrorInfoError
);

impl From<RdpError> for io::Error {
    fn from(e: RdpError) -> io::Error {
        io::Error::new(
            io::ErrorKind::Other,
            format!("RDP connection sequence error: {}", e),
        )
    }
}
