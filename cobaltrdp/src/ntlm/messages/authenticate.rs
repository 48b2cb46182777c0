use std::io;

use byteorder::{LittleEndian, WriteBytesExt};
use rand::rngs::OsRng;
use rand::Rng as _;

use super::computations::{
    compute_lm_v2_response, compute_message_integrity_check, compute_ntlm_v2_hash,
    compute_ntlm_v2_response, generate_challenge, generate_signing_key,
    get_authenticate_target_info,
};
use super::{
    MessageFields, MessageTypes, CLIENT_SEAL_MAGIC, CLIENT_SIGN_MAGIC, NTLM_SIGNATURE,
    SERVER_SEAL_MAGIC, SERVER_SIGN_MAGIC,
};
use crate::crypto::rc4::Rc4;
use crate::ntlm::{
    NegotiateFlags, Ntlm, NtlmState, ENCRYPTED_RANDOM_SESSION_KEY_SIZE,
    MESSAGE_INTEGRITY_CHECK_SIZE, SESSION_KEY_SIZE,
};
use crate::sspi::{self, CredentialsBuffers, SspiError, SspiErrorType};

const BASE_OFFSET: usize = 64;
// the MIC slot is always part of the header in NTLMv2
const AUTH_MESSAGE_OFFSET: usize =
    BASE_OFFSET + crate::ntlm::NTLM_VERSION_SIZE + MESSAGE_INTEGRITY_CHECK_SIZE;

struct AuthenticateMessageFields {
    workstation: MessageFields,
    domain_name: MessageFields,
    encrypted_random_session_key: MessageFields,
    user_name: MessageFields,
    lm_challenge_response: MessageFields,
    nt_challenge_response: MessageFields,
}

impl AuthenticateMessageFields {
    fn new(
        identity: &CredentialsBuffers,
        lm_challenge_response: &[u8],
        nt_challenge_response: &[u8],
        negotiate_flags: NegotiateFlags,
        encrypted_random_session_key_buffer: &[u8],
        offset: u32,
    ) -> Self {
        let mut workstation = MessageFields::new();
        let mut domain_name = MessageFields::new();
        let mut encrypted_random_session_key = MessageFields::new();
        let mut user_name = MessageFields::with_buffer(identity.user.clone());
        let mut lm_challenge_response = MessageFields::with_buffer(lm_challenge_response.to_vec());
        let mut nt_challenge_response = MessageFields::with_buffer(nt_challenge_response.to_vec());

        if negotiate_flags.contains(NegotiateFlags::NTLM_SSP_NEGOTIATE_KEY_EXCH) {
            encrypted_random_session_key.buffer = encrypted_random_session_key_buffer.to_vec();
        }

        // the workstation stays empty, no server cares about it

        if !identity.domain.is_empty() {
            domain_name.buffer = identity.domain.clone();
        }

        domain_name.buffer_offset = offset;
        user_name.buffer_offset = domain_name.buffer_offset + domain_name.buffer.len() as u32;
        workstation.buffer_offset = user_name.buffer_offset + user_name.buffer.len() as u32;
        lm_challenge_response.buffer_offset =
            workstation.buffer_offset + workstation.buffer.len() as u32;
        nt_challenge_response.buffer_offset =
            lm_challenge_response.buffer_offset + lm_challenge_response.buffer.len() as u32;
        encrypted_random_session_key.buffer_offset =
            nt_challenge_response.buffer_offset + nt_challenge_response.buffer.len() as u32;

        Self {
            workstation,
            domain_name,
            encrypted_random_session_key,
            user_name,
            lm_challenge_response,
            nt_challenge_response,
        }
    }

    fn data_len(&self) -> usize {
        self.encrypted_random_session_key.buffer_offset as usize
            + self.encrypted_random_session_key.buffer.len()
    }
}

pub fn write_authenticate(context: &mut Ntlm, mut transport: impl io::Write) -> sspi::SspiResult {
    check_state(context.state)?;

    let negotiate_message = context
        .negotiate_message
        .take()
        .expect("negotiate message must be set on the negotiate phase");
    let challenge_message = context
        .challenge_message
        .take()
        .expect("challenge message must be set on the challenge phase");

    let target_info = get_authenticate_target_info(
        challenge_message.target_info.as_ref(),
        challenge_message.mic_required,
    )?;

    let client_challenge = generate_challenge();
    let ntlm_v2_hash = compute_ntlm_v2_hash(&context.identity)?;
    let lm_challenge_response = compute_lm_v2_response(
        client_challenge.as_ref(),
        challenge_message.server_challenge.as_ref(),
        ntlm_v2_hash.as_ref(),
    )?;
    let (nt_challenge_response, key_exchange_key) = compute_ntlm_v2_response(
        client_challenge.as_ref(),
        challenge_message.server_challenge.as_ref(),
        target_info.as_ref(),
        ntlm_v2_hash.as_ref(),
        challenge_message.timestamp,
    )?;

    let session_key = OsRng.gen::<[u8; SESSION_KEY_SIZE]>();
    let encrypted_session_key_vec = Rc4::new(&key_exchange_key).process(session_key.as_ref());
    let mut encrypted_session_key = [0x00; ENCRYPTED_RANDOM_SESSION_KEY_SIZE];
    encrypted_session_key.clone_from_slice(encrypted_session_key_vec.as_ref());

    context.flags = get_flags(context.flags, &context.identity);
    let message_fields = AuthenticateMessageFields::new(
        &context.identity,
        lm_challenge_response.as_ref(),
        nt_challenge_response.as_ref(),
        context.flags,
        encrypted_session_key.as_ref(),
        AUTH_MESSAGE_OFFSET as u32,
    );

    let mut buffer = Vec::with_capacity(message_fields.data_len());

    write_header(context.flags, context.version.as_ref(), &message_fields, &mut buffer)?;
    write_payload(&message_fields, &mut buffer)?;

    if challenge_message.mic_required {
        let mic = compute_message_integrity_check(
            negotiate_message.message.as_ref(),
            challenge_message.message.as_ref(),
            buffer.as_ref(),
            session_key.as_ref(),
        )?;
        patch_mic(buffer.as_mut(), &mic);
    }

    transport.write_all(buffer.as_slice())?;
    transport.flush()?;

    context.send_signing_key = generate_signing_key(session_key.as_ref(), CLIENT_SIGN_MAGIC);
    context.recv_signing_key = generate_signing_key(session_key.as_ref(), SERVER_SIGN_MAGIC);
    context.send_sealing_key = Some(Rc4::new(&generate_signing_key(
        session_key.as_ref(),
        CLIENT_SEAL_MAGIC,
    )));
    context.recv_sealing_key = Some(Rc4::new(&generate_signing_key(
        session_key.as_ref(),
        SERVER_SEAL_MAGIC,
    )));

    context.state = NtlmState::Final;

    Ok(sspi::SspiOk::CompleteNeeded)
}

fn check_state(state: NtlmState) -> sspi::Result<()> {
    if state != NtlmState::Authenticate {
        Err(SspiError::new(
            SspiErrorType::OutOfSequence,
            String::from("authenticate message write fired but the state is not Authenticate"),
        ))
    } else {
        Ok(())
    }
}

fn get_flags(negotiate_flags: NegotiateFlags, identity: &CredentialsBuffers) -> NegotiateFlags {
    // keep KEY_EXCH only if the server negotiated it in the challenge
    let mut negotiate_flags = negotiate_flags & NegotiateFlags::NTLM_SSP_NEGOTIATE_KEY_EXCH;

    if !identity.domain.is_empty() {
        negotiate_flags |= NegotiateFlags::NTLM_SSP_NEGOTIATE_DOMAIN_SUPPLIED;
    }

    negotiate_flags
        | NegotiateFlags::NTLM_SSP_NEGOTIATE128
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_EXTENDED_SESSION_SECURITY
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_ALWAYS_SIGN
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_NTLM
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_SEAL
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_SIGN
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_REQUEST_TARGET
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_UNICODE
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_TARGET_INFO
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_VERSION
}

fn write_header(
    negotiate_flags: NegotiateFlags,
    version: &[u8],
    message_fields: &AuthenticateMessageFields,
    mut buffer: impl io::Write,
) -> io::Result<()> {
    buffer.write_all(NTLM_SIGNATURE)?; // signature 8 bytes
    buffer.write_u32::<LittleEndian>(MessageTypes::Authenticate as u32)?; // message type 4 bytes
    message_fields.lm_challenge_response.write_to(&mut buffer)?; // LmChallengeResponseFields 8 bytes
    message_fields.nt_challenge_response.write_to(&mut buffer)?; // NtChallengeResponseFields 8 bytes
    message_fields.domain_name.write_to(&mut buffer)?; // DomainNameFields 8 bytes
    message_fields.user_name.write_to(&mut buffer)?; // UserNameFields 8 bytes
    message_fields.workstation.write_to(&mut buffer)?; // WorkstationFields 8 bytes
    message_fields
        .encrypted_random_session_key
        .write_to(&mut buffer)?; // EncryptedRandomSessionKeyFields 8 bytes
    buffer.write_u32::<LittleEndian>(negotiate_flags.bits())?; // NegotiateFlags 4 bytes
    buffer.write_all(version)?;

    // the MIC slot; the real value is patched in after the whole message
    // exists, since it is an HMAC over these very bytes
    buffer.write_all(&[0x00; MESSAGE_INTEGRITY_CHECK_SIZE])?;

    Ok(())
}

fn write_payload(
    message_fields: &AuthenticateMessageFields,
    mut buffer: impl io::Write,
) -> io::Result<()> {
    message_fields.domain_name.write_buffer_to(&mut buffer)?;
    message_fields.user_name.write_buffer_to(&mut buffer)?;
    message_fields.workstation.write_buffer_to(&mut buffer)?;
    message_fields
        .lm_challenge_response
        .write_buffer_to(&mut buffer)?;
    message_fields
        .nt_challenge_response
        .write_buffer_to(&mut buffer)?;
    message_fields
        .encrypted_random_session_key
        .write_buffer_to(&mut buffer)?;

    Ok(())
}

fn patch_mic(message: &mut [u8], mic: &[u8; MESSAGE_INTEGRITY_CHECK_SIZE]) {
    let mic_offset = AUTH_MESSAGE_OFFSET - MESSAGE_INTEGRITY_CHECK_SIZE;
    message[mic_offset..AUTH_MESSAGE_OFFSET].clone_from_slice(mic);
}
