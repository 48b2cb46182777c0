use byteorder::{LittleEndian, WriteBytesExt};

use super::*;

const TEST_PUBLIC_KEY: [u8; 6] = [0x30, 0x04, 0x02, 0x02, 0x12, 0x34];

fn test_credentials() -> Credentials {
    Credentials::new(
        String::from("User"),
        String::from("Password"),
        Some(String::from("DOMAIN")),
    )
}

// A minimal, valid Type-2 challenge: empty target name, a target info with a
// timestamp pair, no version trailer.
fn synthetic_challenge_message() -> Vec<u8> {
    let flags: u32 = 0x4000_0000 // KEY_EXCH
        | 0x0008_0000 // EXTENDED_SESSION_SECURITY
        | 0x0080_0000 // TARGET_INFO
        | 0x0000_0200 // NTLM
        | 0x0000_0001; // UNICODE

    let mut target_info = Vec::new();
    target_info.write_u16::<LittleEndian>(7).unwrap(); // MsvAvTimestamp
    target_info.write_u16::<LittleEndian>(8).unwrap();
    target_info
        .write_u64::<LittleEndian>(0x01d0_0000_0000_0000)
        .unwrap();
    target_info.write_u16::<LittleEndian>(0).unwrap(); // MsvAvEOL
    target_info.write_u16::<LittleEndian>(0).unwrap();

    let mut message = Vec::new();
    message.extend_from_slice(b"NTLMSSP\0");
    message.write_u32::<LittleEndian>(2).unwrap(); // message type
    message.write_u16::<LittleEndian>(0).unwrap(); // target name len
    message.write_u16::<LittleEndian>(0).unwrap(); // target name max len
    message.write_u32::<LittleEndian>(48).unwrap(); // target name offset
    message.write_u32::<LittleEndian>(flags).unwrap();
    message.extend_from_slice(&[0x11; 8]); // server challenge
    message.extend_from_slice(&[0x00; 8]); // reserved
    message
        .write_u16::<LittleEndian>(target_info.len() as u16)
        .unwrap();
    message
        .write_u16::<LittleEndian>(target_info.len() as u16)
        .unwrap();
    message.write_u32::<LittleEndian>(48).unwrap(); // target info offset
    message.extend_from_slice(&target_info);

    message
}

#[test]
fn ts_request_round_trips_all_fields() {
    let request = TsRequest {
        peer_version: Some(6),
        nego_tokens: Some(vec![0x01, 0x02]),
        auth_info: Some(vec![0xAA, 0xBB]),
        pub_key_auth: Some(vec![0xCC, 0xDD]),
        error_code: None,
        client_nonce: None,
    };

    let mut buffer = Vec::new();
    request.encode_ts_request(&mut buffer).unwrap();
    assert_eq!(usize::from(request.buffer_len()), buffer.len());

    let decoded = TsRequest::from_buffer(buffer.as_slice()).unwrap();
    assert_eq!(Some(6), decoded.peer_version);
    assert_eq!(Some(vec![0x01, 0x02]), decoded.nego_tokens);
    assert_eq!(Some(vec![0xAA, 0xBB]), decoded.auth_info);
    assert_eq!(Some(vec![0xCC, 0xDD]), decoded.pub_key_auth);
}

#[test]
fn ts_request_round_trips_client_nonce() {
    let request = TsRequest {
        peer_version: Some(6),
        client_nonce: Some([0x5a; NONCE_SIZE]),
        ..TsRequest::default()
    };

    let mut buffer = Vec::new();
    request.encode_ts_request(&mut buffer).unwrap();

    let decoded = TsRequest::from_buffer(buffer.as_slice()).unwrap();
    assert_eq!(Some([0x5a; NONCE_SIZE]), decoded.client_nonce);
}

#[test]
fn ts_request_length_prefix_matches_the_encoding() {
    let request = TsRequest {
        peer_version: Some(6),
        nego_tokens: Some(vec![0x00; 300]),
        ..TsRequest::default()
    };

    let mut buffer = Vec::new();
    request.encode_ts_request(&mut buffer).unwrap();

    assert_eq!(
        buffer.len(),
        TsRequest::read_length(buffer.as_slice()).unwrap()
    );
}

#[test]
fn ts_request_with_error_code_fails_the_check() {
    let request = TsRequest {
        peer_version: Some(6),
        error_code: Some(0xc000_006d),
        ..TsRequest::default()
    };

    assert!(request.check_error().is_err());
}

#[test]
fn ts_credentials_are_utf16_encoded() {
    let buffer = ts_request::write_ts_credentials(&test_credentials().into()).unwrap();

    let expected_user: Vec<u8> = crate::utils::string_to_utf16("User");
    assert!(buffer
        .windows(expected_user.len())
        .any(|window| window == expected_user.as_slice()));
}

#[test]
fn first_client_leg_produces_a_negotiate_token() {
    let mut client = CredSspClient::new(TEST_PUBLIC_KEY.to_vec(), test_credentials());

    match client.process(TsRequest::default()).unwrap() {
        CredSspResult::ReplyNeeded(ts_request) => {
            let token = ts_request.nego_tokens.expect("first leg must carry a token");
            assert_eq!(b"NTLMSSP\0", &token[0..8]);
        }
        result => panic!("unexpected CredSSP result: {:?}", result),
    }
}

#[test]
fn second_client_leg_attaches_the_public_key_binding() {
    let mut client = CredSspClient::new(TEST_PUBLIC_KEY.to_vec(), test_credentials());

    client.process(TsRequest::default()).unwrap();

    let challenge_request = TsRequest {
        peer_version: Some(6),
        nego_tokens: Some(synthetic_challenge_message()),
        ..TsRequest::default()
    };

    match client.process(challenge_request).unwrap() {
        CredSspResult::ReplyNeeded(ts_request) => {
            let token = ts_request.nego_tokens.expect("authenticate token expected");
            assert_eq!(b"NTLMSSP\0", &token[0..8]);
            assert!(ts_request.pub_key_auth.is_some());
            assert!(ts_request.client_nonce.is_some());
        }
        result => panic!("unexpected CredSSP result: {:?}", result),
    }

    // one sealed message went out, so the outbound sequence number is one
    assert_eq!(1, client.context.as_ref().unwrap().send_seq_num);
}

#[test]
fn forged_server_binding_is_rejected() {
    let mut client = CredSspClient::new(TEST_PUBLIC_KEY.to_vec(), test_credentials());

    client.process(TsRequest::default()).unwrap();
    client
        .process(TsRequest {
            peer_version: Some(6),
            nego_tokens: Some(synthetic_challenge_message()),
            ..TsRequest::default()
        })
        .unwrap();

    let forged = TsRequest {
        peer_version: Some(6),
        pub_key_auth: Some(vec![0x00; 32]),
        ..TsRequest::default()
    };

    let err = client.process(forged).unwrap_err();
    assert_eq!(SspiErrorType::MessageAltered, err.error_type);
}

#[test]
fn changed_peer_version_is_rejected() {
    let mut client = CredSspClient::new(TEST_PUBLIC_KEY.to_vec(), test_credentials());

    client.process(TsRequest::default()).unwrap();
    client
        .process(TsRequest {
            peer_version: Some(6),
            nego_tokens: Some(synthetic_challenge_message()),
            ..TsRequest::default()
        })
        .unwrap();

    let err = client
        .process(TsRequest {
            peer_version: Some(2),
            pub_key_auth: Some(vec![0x00; 32]),
            ..TsRequest::default()
        })
        .unwrap_err();
    assert_eq!(SspiErrorType::MessageAltered, err.error_type);
}

#[test]
fn early_user_auth_result_round_trips() {
    let mut buffer = Vec::new();
    EarlyUserAuthResult::Success.to_buffer(&mut buffer).unwrap();
    assert_eq!(vec![0x00, 0x00, 0x00, 0x00], buffer);

    assert_eq!(
        EarlyUserAuthResult::AccessDenied,
        EarlyUserAuthResult::from_buffer([0x05, 0x00, 0x00, 0x00].as_ref()).unwrap()
    );
}

#[test]
fn binding_hashes_differ_per_direction() {
    let nonce = [0x01; NONCE_SIZE];

    assert_ne!(
        binding_hash(CLIENT_SERVER_HASH_MAGIC, &nonce, &TEST_PUBLIC_KEY),
        binding_hash(SERVER_CLIENT_HASH_MAGIC, &nonce, &TEST_PUBLIC_KEY)
    );
}
