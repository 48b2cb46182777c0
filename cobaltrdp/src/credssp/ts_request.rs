use std::io::{self, Read};

use crate::ber;
use crate::sspi::{self, CredentialsBuffers, SspiError, SspiErrorType};

pub const NONCE_SIZE: usize = 32;

pub const MAX_TS_REQUEST_LENGTH_BUFFER_SIZE: usize = 4;

const NLA_VERSION: u32 = 6;
const NONCE_FIELD_LEN: u16 = 36;

/// The DER-encoded CredSSP envelope: an optional NTLM token, the sealed
/// credentials, the sealed public-key binding, and bookkeeping fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsRequest {
    /// The CredSSP version the peer speaks.
    pub peer_version: Option<u32>,
    /// The NTLM message of the current handshake leg.
    pub nego_tokens: Option<Vec<u8>>,
    /// The GSS-sealed TSCredentials.
    pub auth_info: Option<Vec<u8>>,
    /// The GSS-sealed public-key binding token.
    pub pub_key_auth: Option<Vec<u8>>,
    /// SPNEGO failure code reported by the server.
    pub error_code: Option<u32>,
    /// Entropy for the version 5+ binding hash.
    pub client_nonce: Option<[u8; NONCE_SIZE]>,
}

impl TsRequest {
    /// Reads the total length of a DER-encoded TSRequest from its first
    /// bytes, so a transport knows how much more to pull off the stream.
    pub fn read_length(mut buffer: impl io::Read) -> io::Result<usize> {
        let mut length_buffer = [0x00; MAX_TS_REQUEST_LENGTH_BUFFER_SIZE];
        buffer.read_exact(&mut length_buffer)?;

        let sequence_length = ber::read_sequence_tag(&mut length_buffer.as_ref())?;

        Ok(usize::from(ber::sizeof_sequence(sequence_length)))
    }

    pub fn from_buffer(buffer: &[u8]) -> io::Result<TsRequest> {
        let mut stream = io::Cursor::new(buffer);

        let ts_request_len = ber::read_sequence_tag(&mut stream)?;
        if buffer.len() < usize::from(ber::sizeof_sequence(ts_request_len)) {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "incomplete TSRequest buffer",
            ));
        }

        ber::read_contextual_tag(&mut stream, 0, ber::Pc::Construct)?;
        let peer_version = ber::read_integer(&mut stream)? as u32;

        let nego_tokens = if ber::read_contextual_tag_or_unwind(&mut stream, 1, ber::Pc::Construct)?
            .is_some()
        {
            ber::read_sequence_tag(&mut stream)?; // SEQUENCE OF NegoDataItem
            ber::read_sequence_tag(&mut stream)?; // NegoDataItem
            ber::read_contextual_tag(&mut stream, 0, ber::Pc::Construct)?;
            let length = ber::read_octet_string_tag(&mut stream)?;
            let mut nego_tokens = vec![0x00; usize::from(length)];
            stream.read_exact(&mut nego_tokens)?;

            Some(nego_tokens)
        } else {
            None
        };

        let auth_info = if ber::read_contextual_tag_or_unwind(&mut stream, 2, ber::Pc::Construct)?
            .is_some()
        {
            let length = ber::read_octet_string_tag(&mut stream)?;
            let mut auth_info = vec![0x00; usize::from(length)];
            stream.read_exact(&mut auth_info)?;

            Some(auth_info)
        } else {
            None
        };

        let pub_key_auth = if ber::read_contextual_tag_or_unwind(&mut stream, 3, ber::Pc::Construct)?
            .is_some()
        {
            let length = ber::read_octet_string_tag(&mut stream)?;
            let mut pub_key_auth = vec![0x00; usize::from(length)];
            stream.read_exact(&mut pub_key_auth)?;

            Some(pub_key_auth)
        } else {
            None
        };

        let error_code = if peer_version >= 3
            && ber::read_contextual_tag_or_unwind(&mut stream, 4, ber::Pc::Construct)?.is_some()
        {
            Some(ber::read_integer(&mut stream)? as u32)
        } else {
            None
        };

        let client_nonce = if peer_version >= 5
            && ber::read_contextual_tag_or_unwind(&mut stream, 5, ber::Pc::Construct)?.is_some()
        {
            let length = ber::read_octet_string_tag(&mut stream)?;
            if length != NONCE_SIZE as u16 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("got clientNonce with invalid length: {}", length),
                ));
            }

            let mut client_nonce = [0x00; NONCE_SIZE];
            stream.read_exact(&mut client_nonce)?;

            Some(client_nonce)
        } else {
            None
        };

        Ok(TsRequest {
            peer_version: Some(peer_version),
            nego_tokens,
            auth_info,
            pub_key_auth,
            error_code,
            client_nonce,
        })
    }

    pub fn encode_ts_request(&self, mut buffer: impl io::Write) -> io::Result<()> {
        let len = self.ts_request_len();

        ber::write_sequence_tag(&mut buffer, len)?;
        /* [0] version */
        ber::write_contextual_tag(
            &mut buffer,
            0,
            ber::sizeof_integer(NLA_VERSION),
            ber::Pc::Construct,
        )?;
        ber::write_integer(&mut buffer, NLA_VERSION)?;

        /* [1] negoTokens (SEQUENCE OF NegoDataItem) */
        if let Some(ref nego_tokens) = self.nego_tokens {
            let octet_string_len = ber::sizeof_sequence_octet_string(nego_tokens.len() as u16);
            ber::write_contextual_tag(
                &mut buffer,
                1,
                ber::sizeof_sequence(ber::sizeof_sequence(octet_string_len)),
                ber::Pc::Construct,
            )?;
            ber::write_sequence_tag(&mut buffer, ber::sizeof_sequence(octet_string_len))?;
            ber::write_sequence_tag(&mut buffer, octet_string_len)?;
            ber::write_sequence_octet_string(&mut buffer, 0, nego_tokens)?;
        }

        /* [2] authInfo (OCTET STRING) */
        if let Some(ref auth_info) = self.auth_info {
            ber::write_sequence_octet_string(&mut buffer, 2, auth_info)?;
        }

        /* [3] pubKeyAuth (OCTET STRING) */
        if let Some(ref pub_key_auth) = self.pub_key_auth {
            ber::write_sequence_octet_string(&mut buffer, 3, pub_key_auth)?;
        }

        /* [4] errorCode (INTEGER) */
        if let (Some(peer_version), Some(error_code)) = (self.peer_version, self.error_code) {
            if peer_version >= 3 {
                ber::write_contextual_tag(
                    &mut buffer,
                    4,
                    ber::sizeof_integer(error_code),
                    ber::Pc::Construct,
                )?;
                ber::write_integer(&mut buffer, error_code)?;
            }
        }

        /* [5] clientNonce (OCTET STRING) */
        if let Some(ref client_nonce) = self.client_nonce {
            if self.peer_version.unwrap_or(NLA_VERSION) >= 5 {
                ber::write_sequence_octet_string(&mut buffer, 5, client_nonce)?;
            }
        }

        Ok(())
    }

    pub fn buffer_len(&self) -> u16 {
        ber::sizeof_sequence(self.ts_request_len())
    }

    pub fn check_error(&self) -> sspi::Result<()> {
        match self.error_code {
            Some(error_code) if error_code != 0 => Err(SspiError::new(
                SspiErrorType::InvalidToken,
                format!("the server has returned an error: 0x{:08x}", error_code),
            )),
            _ => Ok(()),
        }
    }

    fn ts_request_len(&self) -> u16 {
        let error_code_len = match (self.peer_version, self.error_code) {
            (Some(peer_version), Some(error_code)) if peer_version >= 3 => {
                let len = ber::sizeof_integer(error_code);

                len + ber::sizeof_contextual_tag(len)
            }
            _ => 0,
        };
        let client_nonce_len =
            if self.client_nonce.is_some() && self.peer_version.unwrap_or(NLA_VERSION) >= 5 {
                NONCE_FIELD_LEN
            } else {
                0
            };

        get_nego_tokens_len(&self.nego_tokens)
            + get_field_len(&self.pub_key_auth)
            + get_field_len(&self.auth_info)
            + client_nonce_len
            + error_code_len
            + ber::sizeof_integer(NLA_VERSION)
            + ber::sizeof_contextual_tag(ber::sizeof_integer(NLA_VERSION))
    }
}

/// Encodes TSCredentials around TSPasswordCreds. Every field is UTF-16LE no
/// matter what the NTLM exchange negotiated.
pub fn write_ts_credentials(identity: &CredentialsBuffers) -> io::Result<Vec<u8>> {
    let ts_credentials_len = sizeof_ts_credentials(identity);
    let password_credentials_len = sizeof_ts_password_creds(identity);
    let password_credentials_sequence_len = ber::sizeof_sequence(password_credentials_len);

    let mut buffer = Vec::with_capacity(usize::from(ber::sizeof_sequence(ts_credentials_len)));

    // TSCredentials (SEQUENCE)
    ber::write_sequence_tag(&mut buffer, ts_credentials_len)?;
    // [0] credType (INTEGER), 1 = password
    ber::write_contextual_tag(&mut buffer, 0, ber::sizeof_integer(1), ber::Pc::Construct)?;
    ber::write_integer(&mut buffer, 1)?;
    // [1] credentials (OCTET STRING)
    ber::write_contextual_tag(
        &mut buffer,
        1,
        ber::sizeof_octet_string(password_credentials_sequence_len),
        ber::Pc::Construct,
    )?;
    ber::write_octet_string_tag(&mut buffer, password_credentials_sequence_len)?;

    // TSPasswordCreds (SEQUENCE)
    ber::write_sequence_tag(&mut buffer, password_credentials_len)?;
    // [0] domainName (OCTET STRING)
    ber::write_sequence_octet_string(&mut buffer, 0, &identity.domain)?;
    // [1] userName (OCTET STRING)
    ber::write_sequence_octet_string(&mut buffer, 1, &identity.user)?;
    // [2] password (OCTET STRING)
    ber::write_sequence_octet_string(&mut buffer, 2, &identity.password)?;

    Ok(buffer)
}

fn sizeof_ts_credentials(identity: &CredentialsBuffers) -> u16 {
    ber::sizeof_integer(1)
        + ber::sizeof_contextual_tag(ber::sizeof_integer(1))
        + ber::sizeof_sequence_octet_string(ber::sizeof_sequence(sizeof_ts_password_creds(identity)))
}

fn sizeof_ts_password_creds(identity: &CredentialsBuffers) -> u16 {
    ber::sizeof_sequence_octet_string(identity.domain.len() as u16)
        + ber::sizeof_sequence_octet_string(identity.user.len() as u16)
        + ber::sizeof_sequence_octet_string(identity.password.len() as u16)
}

fn get_nego_tokens_len(nego_tokens: &Option<Vec<u8>>) -> u16 {
    match nego_tokens {
        Some(nego_tokens) => {
            let mut len = ber::sizeof_octet_string(nego_tokens.len() as u16);
            len += ber::sizeof_contextual_tag(len);
            len += ber::sizeof_sequence_tag(len);
            len += ber::sizeof_sequence_tag(len);
            len += ber::sizeof_contextual_tag(len);

            len
        }
        None => 0,
    }
}

fn get_field_len(field: &Option<Vec<u8>>) -> u16 {
    match field {
        Some(field) => {
            let mut len = ber::sizeof_octet_string(field.len() as u16);
            len += ber::sizeof_contextual_tag(len);

            len
        }
        None => 0,
    }
}
