use byteorder::{ByteOrder, LittleEndian};

use super::*;
use crate::sspi::Credentials;

fn test_credentials() -> Credentials {
    Credentials::new(
        String::from("User"),
        String::from("Password"),
        Some(String::from("DOMAIN")),
    )
}

fn context_with_symmetric_keys() -> Ntlm {
    let mut context = Ntlm::new(test_credentials());
    let key = [0x55; HASH_SIZE];

    context.send_signing_key = key;
    context.recv_signing_key = key;
    context.send_sealing_key = Some(Rc4::new(&key));
    context.recv_sealing_key = Some(Rc4::new(&key));

    context
}

#[test]
fn negotiate_message_has_the_fixed_shape() {
    let mut context = Ntlm::new(test_credentials());
    let mut message = Vec::new();

    let status = context
        .initialize_security_context(&[] as &[u8], &mut message)
        .unwrap();
    assert_eq!(sspi::SspiOk::ContinueNeeded, status);

    // "NTLMSSP\0" signature
    assert_eq!(b"NTLMSSP\0", &message[0..8]);
    // message type 1
    assert_eq!(1, LittleEndian::read_u32(&message[8..12]));
    // the negotiated flag mask
    let expected_flags = NegotiateFlags::NTLM_SSP_NEGOTIATE_KEY_EXCH
        | NegotiateFlags::NTLM_SSP_NEGOTIATE128
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_EXTENDED_SESSION_SECURITY
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_ALWAYS_SIGN
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_NTLM
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_SEAL
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_SIGN
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_REQUEST_TARGET
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_UNICODE
        | NegotiateFlags::NTLM_SSP_NEGOTIATE_VERSION;
    assert_eq!(expected_flags.bits(), LittleEndian::read_u32(&message[12..16]));
    // two empty field descriptors plus the version trailer
    assert_eq!(32 + NTLM_VERSION_SIZE, message.len());
}

#[test]
fn gss_seal_then_unseal_round_trips() {
    let mut context = context_with_symmetric_keys();

    let plaintext = b"TSRequest credentials payload";
    let sealed = context.encrypt_message(plaintext, 0).unwrap();

    assert_ne!(&sealed[SIGNATURE_SIZE..], plaintext.as_ref());
    assert_eq!(SIGNATURE_SIZE + plaintext.len(), sealed.len());
    // the signature version prefix
    assert_eq!(1, LittleEndian::read_u32(&sealed[0..4]));
    // the sequence number rides in the signature
    assert_eq!(0, LittleEndian::read_u32(&sealed[12..16]));

    let unsealed = context.decrypt_message(&sealed, 0).unwrap();
    assert_eq!(plaintext.to_vec(), unsealed);
}

#[test]
fn gss_unseal_rejects_tampered_payload() {
    let mut context = context_with_symmetric_keys();

    let mut sealed = context.encrypt_message(b"payload", 0).unwrap();
    sealed[SIGNATURE_SIZE] ^= 0xff;

    let err = context.decrypt_message(&sealed, 0).unwrap_err();
    assert_eq!(SspiErrorType::MessageAltered, err.error_type);
}

#[test]
fn gss_unseal_rejects_wrong_sequence_number() {
    let mut context = context_with_symmetric_keys();

    let sealed = context.encrypt_message(b"payload", 0).unwrap();

    let err = context.decrypt_message(&sealed, 1).unwrap_err();
    assert_eq!(SspiErrorType::MessageAltered, err.error_type);
}

#[test]
fn gss_unseal_rejects_truncated_message() {
    let mut context = context_with_symmetric_keys();

    let err = context.decrypt_message(&[0x01, 0x00], 0).unwrap_err();
    assert_eq!(SspiErrorType::InvalidToken, err.error_type);
}

#[test]
fn out_of_sequence_state_is_rejected() {
    let mut context = Ntlm::new(test_credentials());
    context.state = NtlmState::Final;

    let err = context
        .initialize_security_context(&[] as &[u8], Vec::new())
        .unwrap_err();
    assert_eq!(SspiErrorType::OutOfSequence, err.error_type);
}
