use std::{error::Error, fmt, io};

use crate::utils;

pub type SspiResult = std::result::Result<SspiOk, SspiError>;
pub type Result<T> = std::result::Result<T, SspiError>;

/// The seam between CredSSP and the security package that produces and
/// consumes its tokens. NTLM is the only package this client ships.
pub trait Sspi {
    fn initialize_security_context(
        &mut self,
        input: impl io::Read,
        output: impl io::Write,
    ) -> SspiResult;
    fn encrypt_message(&mut self, input: &[u8], message_seq_number: u32) -> self::Result<Vec<u8>>;
    fn decrypt_message(&mut self, input: &[u8], message_seq_number: u32) -> self::Result<Vec<u8>>;
}

/// Plain-text identity of the connecting user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub domain: Option<String>,
}

impl Credentials {
    pub fn new(username: String, password: String, domain: Option<String>) -> Self {
        Self {
            username,
            password,
            domain,
        }
    }
}

/// The same identity as UTF-16LE byte buffers, the only form NTLM and
/// TSPasswordCreds ever put on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CredentialsBuffers {
    pub user: Vec<u8>,
    pub domain: Vec<u8>,
    pub password: Vec<u8>,
}

impl CredentialsBuffers {
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() || self.password.is_empty()
    }
}

impl From<Credentials> for CredentialsBuffers {
    fn from(credentials: Credentials) -> Self {
        Self {
            user: utils::string_to_utf16(credentials.username.as_str()),
            domain: credentials
                .domain
                .map(|v| utils::string_to_utf16(v.as_str()))
                .unwrap_or_default(),
            password: utils::string_to_utf16(credentials.password.as_str()),
        }
    }
}

#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SspiErrorType {
    InternalError = 0x8009_0304,
    InvalidToken = 0x8009_0308,
    OutOfSequence = 0x8009_0310,
    MessageAltered = 0x8009_030F,
    TargetUnknown = 0x8009_0303,
}

#[derive(Debug, PartialEq)]
pub struct SspiError {
    pub error_type: SspiErrorType,
    pub description: String,
}

#[derive(Debug, PartialEq)]
pub enum SspiOk {
    ContinueNeeded = 0x0009_0312,
    CompleteNeeded = 0x0009_0313,
}

impl SspiError {
    pub fn new(error_type: SspiErrorType, description: String) -> Self {
        Self {
            error_type,
            description,
        }
    }
}

impl Error for SspiError {}

impl fmt::Display for SspiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.description)
    }
}

impl From<io::Error> for SspiError {
    fn from(err: io::Error) -> Self {
        Self::new(SspiErrorType::InternalError, format!("IO error: {}", err))
    }
}

impl From<SspiError> for io::Error {
    fn from(err: SspiError) -> io::Error {
        io::Error::new(
            io::ErrorKind::Other,
            format!("{:?}: {}", err.error_type, err.description),
        )
    }
}

impl fmt::Display for SspiOk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
