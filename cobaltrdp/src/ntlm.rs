mod messages;
#[cfg(test)]
mod tests;

use std::io;

use bitflags::bitflags;
use byteorder::{LittleEndian, WriteBytesExt};

use self::messages::{read_challenge, write_authenticate, write_negotiate};
use crate::crypto::{compute_hmac_md5, rc4::Rc4, HASH_SIZE};
use crate::sspi::{self, CredentialsBuffers, Sspi, SspiError, SspiErrorType};

pub const NTLM_VERSION_SIZE: usize = 8;
pub const ENCRYPTED_RANDOM_SESSION_KEY_SIZE: usize = 16;

/// Major 6, minor 1, build 7601, NTLMSSP revision 15.
pub const NTLM_VERSION: [u8; NTLM_VERSION_SIZE] =
    [0x06, 0x01, 0xb1, 0x1d, 0x00, 0x00, 0x00, 0x0f];

const SIGNATURE_SIZE: usize =
    SIGNATURE_VERSION_SIZE + SIGNATURE_CHECKSUM_SIZE + SIGNATURE_SEQ_NUM_SIZE;
const CHALLENGE_SIZE: usize = 8;
const SESSION_KEY_SIZE: usize = 16;
const MESSAGE_INTEGRITY_CHECK_SIZE: usize = 16;
const LM_CHALLENGE_RESPONSE_BUFFER_SIZE: usize = HASH_SIZE + CHALLENGE_SIZE;

const SIGNATURE_VERSION_SIZE: usize = 4;
const SIGNATURE_SEQ_NUM_SIZE: usize = 4;
const SIGNATURE_CHECKSUM_SIZE: usize = 8;
const MESSAGES_VERSION: u32 = 1;

#[derive(Copy, Clone, PartialEq, Debug)]
enum NtlmState {
    Initial,
    Negotiate,
    Challenge,
    Authenticate,
    Final,
}

/// Client-side NTLMv2 security context. Drives the three-message handshake
/// and afterwards seals and signs CredSSP payloads with the derived keys.
pub struct Ntlm {
    negotiate_message: Option<NegotiateMessage>,
    challenge_message: Option<ChallengeMessage>,

    state: NtlmState,
    flags: NegotiateFlags,
    identity: CredentialsBuffers,
    version: [u8; NTLM_VERSION_SIZE],

    send_signing_key: [u8; HASH_SIZE],
    recv_signing_key: [u8; HASH_SIZE],
    send_sealing_key: Option<Rc4>,
    recv_sealing_key: Option<Rc4>,
}

struct NegotiateMessage {
    message: Vec<u8>,
}

impl NegotiateMessage {
    fn new(message: Vec<u8>) -> Self {
        Self { message }
    }
}

struct ChallengeMessage {
    message: Vec<u8>,
    target_info: Vec<u8>,
    server_challenge: [u8; CHALLENGE_SIZE],
    timestamp: u64,
    /// A server that put a timestamp into the target info expects a MIC in
    /// the authenticate message.
    mic_required: bool,
}

impl ChallengeMessage {
    fn new(
        message: Vec<u8>,
        target_info: Vec<u8>,
        server_challenge: [u8; CHALLENGE_SIZE],
        timestamp: u64,
        mic_required: bool,
    ) -> Self {
        Self {
            message,
            target_info,
            server_challenge,
            timestamp,
            mic_required,
        }
    }
}

impl Ntlm {
    pub fn new(credentials: sspi::Credentials) -> Self {
        Self {
            negotiate_message: None,
            challenge_message: None,

            state: NtlmState::Initial,
            flags: NegotiateFlags::empty(),
            identity: credentials.into(),
            version: NTLM_VERSION,

            send_signing_key: [0x00; HASH_SIZE],
            recv_signing_key: [0x00; HASH_SIZE],
            send_sealing_key: None,
            recv_sealing_key: None,
        }
    }
}

impl Sspi for Ntlm {
    fn initialize_security_context(
        &mut self,
        input: impl io::Read,
        mut output: impl io::Write,
    ) -> sspi::SspiResult {
        match self.state {
            NtlmState::Initial => {
                self.state = NtlmState::Negotiate;
                write_negotiate(self, &mut output)
            }
            NtlmState::Challenge => {
                read_challenge(self, input)?;
                write_authenticate(self, &mut output)
            }
            _ => Err(SspiError::new(
                SspiErrorType::OutOfSequence,
                format!("got wrong NTLM state: {:?}", self.state),
            )),
        }
    }

    fn encrypt_message(&mut self, input: &[u8], message_seq_num: u32) -> sspi::Result<Vec<u8>> {
        let digest = compute_digest(&self.send_signing_key, message_seq_num, input)?;

        let mut data = self
            .send_sealing_key
            .as_mut()
            .expect("send sealing key must be set after the authenticate message")
            .process(input);

        let checksum = self
            .send_sealing_key
            .as_mut()
            .expect("send sealing key must be set after the authenticate message")
            .process(&digest[0..SIGNATURE_CHECKSUM_SIZE]);
        let mut output = compute_signature(&checksum, message_seq_num).to_vec();
        output.append(&mut data);

        Ok(output)
    }

    fn decrypt_message(&mut self, input: &[u8], message_seq_num: u32) -> sspi::Result<Vec<u8>> {
        if input.len() < SIGNATURE_SIZE {
            return Err(SspiError::new(
                SspiErrorType::InvalidToken,
                String::from("sealed message is shorter than its signature"),
            ));
        }
        let (expected_signature, data) = input.split_at(SIGNATURE_SIZE);

        let decrypted_data = self
            .recv_sealing_key
            .as_mut()
            .expect("recv sealing key must be set after the authenticate message")
            .process(data);

        let digest = compute_digest(&self.recv_signing_key, message_seq_num, &decrypted_data)?;
        let checksum = self
            .recv_sealing_key
            .as_mut()
            .expect("recv sealing key must be set after the authenticate message")
            .process(&digest[0..SIGNATURE_CHECKSUM_SIZE]);
        let signature = compute_signature(&checksum, message_seq_num);

        if !constant_time_eq(expected_signature, signature.as_ref()) {
            return Err(SspiError::new(
                SspiErrorType::MessageAltered,
                String::from("sealed message signature verification failed"),
            ));
        }

        Ok(decrypted_data)
    }
}

bitflags! {
    struct NegotiateFlags: u32 {
        /// W: requests 56-bit encryption
        const NTLM_SSP_NEGOTIATE56 = 0x8000_0000;
        /// V: requests explicit key exchange
        const NTLM_SSP_NEGOTIATE_KEY_EXCH = 0x4000_0000;
        /// U: requests a 128-bit session key
        const NTLM_SSP_NEGOTIATE128 = 0x2000_0000;
        /// r6
        const NTLM_SSP_NEGOTIATE_VERSION = 0x0200_0000;
        /// S
        const NTLM_SSP_NEGOTIATE_TARGET_INFO = 0x0080_0000;
        /// P: NTLMv2 session security
        const NTLM_SSP_NEGOTIATE_EXTENDED_SESSION_SECURITY = 0x0008_0000;
        /// O
        const NTLM_SSP_NEGOTIATE_TARGET_TYPE_SERVER = 0x0002_0000;
        /// N
        const NTLM_SSP_NEGOTIATE_TARGET_TYPE_DOMAIN = 0x0001_0000;
        /// M: requests a signature block
        const NTLM_SSP_NEGOTIATE_ALWAYS_SIGN = 0x0000_8000;
        /// K
        const NTLM_SSP_NEGOTIATE_DOMAIN_SUPPLIED = 0x0000_1000;
        /// H: NTLMv1 session security, kept for the wire mask only
        const NTLM_SSP_NEGOTIATE_NTLM = 0x0000_0200;
        /// E: message confidentiality
        const NTLM_SSP_NEGOTIATE_SEAL = 0x0000_0020;
        /// D
        const NTLM_SSP_NEGOTIATE_SIGN = 0x0000_0010;
        /// C
        const NTLM_SSP_NEGOTIATE_REQUEST_TARGET = 0x0000_0004;
        /// B
        const NTLM_SSP_NEGOTIATE_OEM = 0x0000_0002;
        /// A
        const NTLM_SSP_NEGOTIATE_UNICODE = 0x0000_0001;
    }
}

fn compute_digest(key: &[u8], seq_num: u32, data: &[u8]) -> io::Result<[u8; 16]> {
    let mut digest_data = Vec::with_capacity(SIGNATURE_SEQ_NUM_SIZE + data.len());
    digest_data.write_u32::<LittleEndian>(seq_num)?;
    digest_data.extend_from_slice(data);

    compute_hmac_md5(key, &digest_data)
}

fn compute_signature(checksum: &[u8], seq_num: u32) -> [u8; SIGNATURE_SIZE] {
    let mut signature = [0x00; SIGNATURE_SIZE];
    signature[..SIGNATURE_VERSION_SIZE].clone_from_slice(&MESSAGES_VERSION.to_le_bytes());
    signature[SIGNATURE_VERSION_SIZE..SIGNATURE_VERSION_SIZE + SIGNATURE_CHECKSUM_SIZE]
        .clone_from_slice(checksum);
    signature[SIGNATURE_VERSION_SIZE + SIGNATURE_CHECKSUM_SIZE..]
        .clone_from_slice(&seq_num.to_le_bytes());

    signature
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
