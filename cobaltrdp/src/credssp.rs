pub mod ts_request;

#[cfg(test)]
mod tests;

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};
use rand::rngs::OsRng;
use rand::Rng as _;

use self::ts_request::{TsRequest, NONCE_SIZE};
use crate::crypto::compute_sha256;
use crate::ntlm::Ntlm;
use crate::sspi::{self, Credentials, Sspi, SspiError, SspiErrorType, SspiOk};
use crate::PduParsing;

pub const EARLY_USER_AUTH_RESULT_PDU_SIZE: usize = 4;

const HASH_MAGIC_LEN: usize = 38;
const SERVER_CLIENT_HASH_MAGIC: &[u8; HASH_MAGIC_LEN] = b"CredSSP Server-To-Client Binding Hash\0";
const CLIENT_SERVER_HASH_MAGIC: &[u8; HASH_MAGIC_LEN] = b"CredSSP Client-To-Server Binding Hash\0";

/// The client half of the CredSSP protocol: drives NTLM through the
/// nego-token exchange, proves possession of the TLS public key, then
/// delegates the credentials, sealed, to the server.
pub struct CredSspClient {
    state: CredSspState,
    context: Option<CredSspContext>,
    credentials: Credentials,
    public_key: Vec<u8>,
    client_nonce: [u8; NONCE_SIZE],
}

/// What the caller must do with the processing outcome.
#[derive(Debug)]
pub enum CredSspResult {
    /// Send the TSRequest and feed the server's reply back in.
    ReplyNeeded(TsRequest),
    /// Send the TSRequest; the handshake is over.
    FinalMessage(TsRequest),
    /// Nothing left to exchange.
    Finished,
}

#[derive(Copy, Clone, PartialEq, Debug)]
enum CredSspState {
    Initial,
    NegoToken,
    AuthInfo,
    Final,
}

struct CredSspContext {
    peer_version: Option<u32>,
    ntlm: Ntlm,
    send_seq_num: u32,
    recv_seq_num: u32,
}

impl CredSspClient {
    pub fn new(public_key: Vec<u8>, credentials: Credentials) -> Self {
        Self {
            state: CredSspState::Initial,
            context: None,
            credentials,
            public_key,
            client_nonce: OsRng.gen::<[u8; NONCE_SIZE]>(),
        }
    }

    pub fn process(&mut self, mut ts_request: TsRequest) -> sspi::Result<CredSspResult> {
        ts_request.check_error()?;
        if let Some(ref mut context) = self.context {
            context.check_peer_version(&ts_request)?;
        }

        loop {
            match self.state {
                CredSspState::Initial => {
                    self.context = Some(CredSspContext::new(Ntlm::new(self.credentials.clone())));

                    self.state = CredSspState::NegoToken;
                }
                CredSspState::NegoToken => {
                    let input = ts_request.nego_tokens.take().unwrap_or_default();
                    let mut output = Vec::new();
                    let context = self
                        .context
                        .as_mut()
                        .expect("the CredSSP context must exist past the initial state");
                    let status = context
                        .ntlm
                        .initialize_security_context(input.as_slice(), &mut output)?;
                    ts_request.nego_tokens = Some(output);

                    if status == SspiOk::CompleteNeeded {
                        let peer_version = context.peer_version.ok_or_else(|| {
                            SspiError::new(
                                SspiErrorType::InvalidToken,
                                String::from("the peer did not provide the CredSSP version"),
                            )
                        })?;
                        ts_request.pub_key_auth = Some(context.encrypt_public_key(
                            self.public_key.as_ref(),
                            &self.client_nonce,
                            peer_version,
                        )?);
                        ts_request.client_nonce = Some(self.client_nonce);
                        self.state = CredSspState::AuthInfo;
                    }

                    return Ok(CredSspResult::ReplyNeeded(ts_request));
                }
                CredSspState::AuthInfo => {
                    ts_request.nego_tokens = None;

                    let pub_key_auth = ts_request.pub_key_auth.take().ok_or_else(|| {
                        SspiError::new(
                            SspiErrorType::InvalidToken,
                            String::from("expected an encrypted public key from the server"),
                        )
                    })?;
                    let context = self
                        .context
                        .as_mut()
                        .expect("the CredSSP context must exist past the initial state");
                    let peer_version = context.peer_version.ok_or_else(|| {
                        SspiError::new(
                            SspiErrorType::InvalidToken,
                            String::from("the peer did not provide the CredSSP version"),
                        )
                    })?;
                    context.decrypt_public_key(
                        self.public_key.as_ref(),
                        pub_key_auth.as_ref(),
                        &self.client_nonce,
                        peer_version,
                    )?;

                    ts_request.auth_info =
                        Some(context.encrypt_ts_credentials(&self.credentials)?);

                    self.state = CredSspState::Final;

                    return Ok(CredSspResult::FinalMessage(ts_request));
                }
                CredSspState::Final => return Ok(CredSspResult::Finished),
            }
        }
    }
}

impl CredSspContext {
    fn new(ntlm: Ntlm) -> Self {
        Self {
            peer_version: None,
            ntlm,
            send_seq_num: 0,
            recv_seq_num: 0,
        }
    }

    fn check_peer_version(&mut self, ts_request: &TsRequest) -> sspi::Result<()> {
        match (self.peer_version, ts_request.peer_version) {
            (Some(peer_version), Some(other_peer_version)) => {
                if peer_version != other_peer_version {
                    Err(SspiError::new(
                        SspiErrorType::MessageAltered,
                        format!(
                            "CredSSP peer changed the protocol version from {} to {}",
                            peer_version, other_peer_version
                        ),
                    ))
                } else {
                    Ok(())
                }
            }
            (None, Some(other_peer_version)) => {
                self.peer_version = Some(other_peer_version);

                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Encrypts the public-key binding token. Peers below version 5 get the
    /// sealed key itself; 5 and above get the sealed SHA-256 over
    /// magic ‖ nonce ‖ key.
    fn encrypt_public_key(
        &mut self,
        public_key: &[u8],
        client_nonce: &[u8; NONCE_SIZE],
        peer_version: u32,
    ) -> sspi::Result<Vec<u8>> {
        if peer_version < 5 {
            self.encrypt_message(public_key)
        } else {
            let hash = binding_hash(CLIENT_SERVER_HASH_MAGIC, client_nonce, public_key);

            self.encrypt_message(hash.as_ref())
        }
    }

    /// Verifies the server's public-key binding token. Peers below version 5
    /// echo the key with its first byte incremented; 5 and above reply with
    /// the server-to-client binding hash.
    fn decrypt_public_key(
        &mut self,
        public_key: &[u8],
        encrypted_public_key: &[u8],
        client_nonce: &[u8; NONCE_SIZE],
        peer_version: u32,
    ) -> sspi::Result<()> {
        let decrypted_public_key = self.decrypt_message(encrypted_public_key)?;

        let expected: Vec<u8> = if peer_version < 5 {
            let mut expected = public_key.to_vec();
            integer_increment_le(&mut expected);

            expected
        } else {
            binding_hash(SERVER_CLIENT_HASH_MAGIC, client_nonce, public_key).to_vec()
        };

        if expected != decrypted_public_key {
            return Err(SspiError::new(
                SspiErrorType::MessageAltered,
                String::from("could not verify the server public key binding"),
            ));
        }

        Ok(())
    }

    fn encrypt_ts_credentials(&mut self, credentials: &Credentials) -> sspi::Result<Vec<u8>> {
        let ts_credentials = ts_request::write_ts_credentials(&credentials.clone().into())?;

        self.encrypt_message(&ts_credentials)
    }

    fn encrypt_message(&mut self, buffer: &[u8]) -> sspi::Result<Vec<u8>> {
        let send_seq_num = self.send_seq_num;
        let encrypted = self.ntlm.encrypt_message(buffer, send_seq_num)?;
        self.send_seq_num += 1;

        Ok(encrypted)
    }

    fn decrypt_message(&mut self, buffer: &[u8]) -> sspi::Result<Vec<u8>> {
        let recv_seq_num = self.recv_seq_num;
        let decrypted = self.ntlm.decrypt_message(buffer, recv_seq_num)?;
        self.recv_seq_num += 1;

        Ok(decrypted)
    }
}

/// The Early User Authorization Result PDU, sent by the server right after
/// the CredSSP handshake when HYBRID_EX was negotiated.
#[derive(Debug, PartialEq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum EarlyUserAuthResult {
    Success = 0,
    AccessDenied = 5,
}

impl PduParsing for EarlyUserAuthResult {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let result = stream.read_u32::<LittleEndian>()?;

        EarlyUserAuthResult::from_u32(result).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "got invalid Early User Authorization Result",
            )
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u32::<LittleEndian>(self.to_u32().unwrap())
    }

    fn buffer_length(&self) -> usize {
        EARLY_USER_AUTH_RESULT_PDU_SIZE
    }
}

fn binding_hash(magic: &[u8], client_nonce: &[u8], public_key: &[u8]) -> [u8; 32] {
    let mut data = magic.to_vec();
    data.extend(client_nonce);
    data.extend(public_key);

    compute_sha256(&data)
}

fn integer_increment_le(buffer: &mut [u8]) {
    for elem in buffer.iter_mut() {
        let (value, overflow) = elem.overflowing_add(1);
        *elem = value;
        if !overflow {
            break;
        }
    }
}
