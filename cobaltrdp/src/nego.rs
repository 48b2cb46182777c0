#[cfg(test)]
mod tests;

use std::io::{self, prelude::*};

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use crate::x224::{
    read_and_check_tpdu_header, write_request_tpdu_header, TpktHeader, X224TPDUType,
    TPDU_REQUEST_LENGTH, TPKT_HEADER_LENGTH,
};
use crate::PduParsing;

const COOKIE_PREFIX: &str = "Cookie: mstshash=";
const ROUTING_TOKEN_PREFIX: &str = "Cookie: msts=";

const RDP_NEG_DATA_LENGTH: u16 = 8;
const CR_LF_SEQ_LENGTH: usize = 2;

bitflags! {
    /// The security protocols the client offers in the X.224 connection
    /// request and the server picks one of in the confirm.
    pub struct SecurityProtocol: u32 {
        const RDP = 0;
        const SSL = 1;
        const HYBRID = 2;
        const RDSTLS = 4;
        const HYBRID_EX = 8;
    }
}

bitflags! {
    #[derive(Default)]
    pub struct RequestFlags: u8 {
        const RESTRICTED_ADMIN_MODE_REQUIRED = 0x01;
        const REDIRECTED_AUTHENTICATION_MODE_REQUIRED = 0x02;
        const CORRELATION_INFO_PRESENT = 0x08;
    }
}

bitflags! {
    #[derive(Default)]
    pub struct ResponseFlags: u8 {
        const EXTENDED_CLIENT_DATA_SUPPORTED = 0x01;
        const DYNVC_GFX_PROTOCOL_SUPPORTED = 0x02;
        const RDP_NEG_RSP_RESERVED = 0x04;
        const RESTRICTED_ADMIN_MODE_SUPPORTED = 0x08;
        const REDIRECTED_AUTHENTICATION_MODE_SUPPORTED = 0x10;
    }
}

/// The failure code of an RDP_NEG_FAILURE response.
#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive, ToPrimitive)]
pub enum FailureCode {
    SSLRequiredByServer = 1,
    SSLNotAllowedByServer = 2,
    SSLCertNotOnServer = 3,
    InconsistentFlags = 4,
    HybridRequiredByServer = 5,
    SSLWithUserAuthRequiredByServer = 6,
    HybridExRequiredByServer = 7,
}

impl FailureCode {
    /// What the caller can actually do about the failure.
    pub fn description(self) -> &'static str {
        match self {
            FailureCode::SSLRequiredByServer => "the server requires TLS security",
            FailureCode::SSLNotAllowedByServer => "the server does not allow TLS security",
            FailureCode::SSLCertNotOnServer => "the server has no TLS certificate installed",
            FailureCode::InconsistentFlags => "the negotiation request flags were inconsistent",
            FailureCode::HybridRequiredByServer => "the server requires NLA (CredSSP) security",
            FailureCode::SSLWithUserAuthRequiredByServer => {
                "the server requires TLS with user authentication"
            }
            FailureCode::HybridExRequiredByServer => {
                "the server requires extended NLA (CredSSP with Early User Authorization) security"
            }
        }
    }
}

/// The optional routing line preceding the RDP_NEG_REQ structure.
#[derive(Debug, Clone, PartialEq)]
pub enum NegoData {
    RoutingToken(String),
    Cookie(String),
}

#[derive(Debug, Fail)]
pub enum NegotiationError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "received negotiation failure from server: {}", _0)]
    ResponseFailure(FailureCode),
    #[fail(display = "invalid TPKT header version")]
    TpktVersionError,
}

impl_from_error!(io::Error, NegotiationError, NegotiationError::IOError);

impl From<NegotiationError> for io::Error {
    fn from(e: NegotiationError) -> io::Error {
        io::Error::new(io::ErrorKind::Other, format!("negotiation error: {}", e))
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive, ToPrimitive)]
enum Message {
    Request = 1,
    Response = 2,
    Failure = 3,
}

/// Client X.224 connection request with the embedded RDP_NEG_REQ.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub nego_data: Option<NegoData>,
    pub flags: RequestFlags,
    pub protocol: SecurityProtocol,
    pub src_ref: u16,
}

impl PduParsing for Request {
    type Error = NegotiationError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let _tpkt = TpktHeader::from_buffer(&mut stream)?;

        read_and_check_tpdu_header(&mut stream, X224TPDUType::ConnectionRequest)?;

        let _dst_ref = stream.read_u16::<LittleEndian>()?;
        let src_ref = stream.read_u16::<LittleEndian>()?;
        let _class = stream.read_u8()?;

        let mut buffer = Vec::new();
        stream.read_to_end(&mut buffer)?;
        let mut stream = buffer.as_slice();

        let nego_data = if let Some((nego_data, read_len)) = read_nego_data(stream) {
            stream.consume(read_len);

            Some(nego_data)
        } else {
            None
        };

        if stream.len() >= RDP_NEG_DATA_LENGTH as usize {
            let neg_req = Message::from_u8(stream.read_u8()?)
                .filter(|msg| *msg == Message::Request)
                .ok_or_else(|| {
                    NegotiationError::IOError(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "invalid negotiation request code",
                    ))
                })?;
            debug_assert_eq!(Message::Request, neg_req);

            let flags = RequestFlags::from_bits_truncate(stream.read_u8()?);
            let _length = stream.read_u16::<LittleEndian>()?;
            let protocol = SecurityProtocol::from_bits_truncate(stream.read_u32::<LittleEndian>()?);

            Ok(Self {
                nego_data,
                flags,
                protocol,
                src_ref,
            })
        } else {
            Ok(Self {
                nego_data,
                flags: RequestFlags::empty(),
                protocol: SecurityProtocol::RDP,
                src_ref,
            })
        }
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        TpktHeader::new(self.buffer_length()).to_buffer(&mut stream)?;

        let tpdu_length = self.buffer_length() - TPKT_HEADER_LENGTH;
        write_request_tpdu_header(
            &mut stream,
            X224TPDUType::ConnectionRequest,
            tpdu_length as u8,
            self.src_ref,
        )?;

        match &self.nego_data {
            Some(NegoData::Cookie(cookie)) => writeln!(&mut stream, "{}{}\r", COOKIE_PREFIX, cookie)?,
            Some(NegoData::RoutingToken(token)) => {
                writeln!(&mut stream, "{}{}\r", ROUTING_TOKEN_PREFIX, token)?
            }
            None => (),
        }

        if self.protocol.bits() > SecurityProtocol::RDP.bits() {
            stream.write_u8(Message::Request.to_u8().unwrap())?;
            stream.write_u8(self.flags.bits())?;
            stream.write_u16::<LittleEndian>(RDP_NEG_DATA_LENGTH)?;
            stream.write_u32::<LittleEndian>(self.protocol.bits())?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        TPDU_REQUEST_LENGTH
            + match &self.nego_data {
                Some(NegoData::Cookie(cookie)) => {
                    cookie.len() + COOKIE_PREFIX.len() + CR_LF_SEQ_LENGTH
                }
                Some(NegoData::RoutingToken(token)) => {
                    token.len() + ROUTING_TOKEN_PREFIX.len() + CR_LF_SEQ_LENGTH
                }
                None => 0,
            }
            + if self.protocol.bits() > SecurityProtocol::RDP.bits() {
                usize::from(RDP_NEG_DATA_LENGTH)
            } else {
                0
            }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    Response {
        flags: ResponseFlags,
        protocol: SecurityProtocol,
    },
    Failure {
        code: FailureCode,
    },
}

/// Server X.224 connection confirm carrying an RDP_NEG_RSP or RDP_NEG_FAILURE.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub response: Option<ResponseData>,
    pub dst_ref: u16,
    pub src_ref: u16,
}

impl PduParsing for Response {
    type Error = NegotiationError;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let _tpkt = TpktHeader::from_buffer(&mut stream)?;

        read_and_check_tpdu_header(&mut stream, X224TPDUType::ConnectionConfirm)?;

        let dst_ref = stream.read_u16::<LittleEndian>()?;
        let src_ref = stream.read_u16::<LittleEndian>()?;
        let _class = stream.read_u8()?;

        let neg_resp = Message::from_u8(stream.read_u8()?).ok_or_else(|| {
            NegotiationError::IOError(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid negotiation response code",
            ))
        })?;
        let flags = ResponseFlags::from_bits_truncate(stream.read_u8()?);
        let _length = stream.read_u16::<LittleEndian>()?;

        match neg_resp {
            Message::Response => {
                let protocol =
                    SecurityProtocol::from_bits_truncate(stream.read_u32::<LittleEndian>()?);

                Ok(Self {
                    response: Some(ResponseData::Response { flags, protocol }),
                    dst_ref,
                    src_ref,
                })
            }
            Message::Failure => {
                let code =
                    FailureCode::from_u32(stream.read_u32::<LittleEndian>()?).ok_or_else(|| {
                        NegotiationError::IOError(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "invalid negotiation failure code",
                        ))
                    })?;

                Err(NegotiationError::ResponseFailure(code))
            }
            Message::Request => Err(NegotiationError::IOError(io::Error::new(
                io::ErrorKind::InvalidData,
                "got negotiation request from server",
            ))),
        }
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        TpktHeader::new(self.buffer_length()).to_buffer(&mut stream)?;

        let tpdu_length = self.buffer_length() - TPKT_HEADER_LENGTH;
        write_request_tpdu_header(
            &mut stream,
            X224TPDUType::ConnectionConfirm,
            tpdu_length as u8,
            self.src_ref,
        )?;

        match &self.response {
            Some(ResponseData::Response { flags, protocol }) => {
                stream.write_u8(Message::Response.to_u8().unwrap())?;
                stream.write_u8(flags.bits())?;
                stream.write_u16::<LittleEndian>(RDP_NEG_DATA_LENGTH)?;
                stream.write_u32::<LittleEndian>(protocol.bits())?;
            }
            Some(ResponseData::Failure { code }) => {
                stream.write_u8(Message::Failure.to_u8().unwrap())?;
                stream.write_u8(0)?; // flags
                stream.write_u16::<LittleEndian>(RDP_NEG_DATA_LENGTH)?;
                stream.write_u32::<LittleEndian>(code.to_u32().unwrap())?;
            }
            None => (),
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        TPDU_REQUEST_LENGTH + RDP_NEG_DATA_LENGTH as usize
    }
}

fn read_nego_data(stream: &[u8]) -> Option<(NegoData, usize)> {
    if let Ok((routing_token, read_len)) = read_string_with_cr_lf(stream, ROUTING_TOKEN_PREFIX) {
        Some((NegoData::RoutingToken(routing_token), read_len))
    } else if let Ok((cookie, read_len)) = read_string_with_cr_lf(stream, COOKIE_PREFIX) {
        Some((NegoData::Cookie(cookie), read_len))
    } else {
        None
    }
}

fn read_string_with_cr_lf(
    mut stream: impl io::BufRead,
    start: &str,
) -> io::Result<(String, usize)> {
    let mut read_start = String::new();
    stream
        .by_ref()
        .take(start.len() as u64)
        .read_to_string(&mut read_start)?;

    if read_start != start {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unsupported or missing routing line prefix",
        ));
    }

    let mut value = String::new();
    stream.read_line(&mut value)?;
    if value.pop() != Some('\n') || value.pop() != Some('\r') {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "routing line is not CR-LF terminated",
        ));
    }

    let value_len = value.len();

    Ok((value, start.len() + value_len + CR_LF_SEQ_LENGTH))
}
