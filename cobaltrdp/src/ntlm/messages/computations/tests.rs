use super::*;

fn test_identity() -> CredentialsBuffers {
    CredentialsBuffers::from(crate::sspi::Credentials::new(
        String::from("User"),
        String::from("Password"),
        Some(String::from("Domain")),
    ))
}

#[test]
fn ntlm_v2_hash_is_deterministic_and_sixteen_bytes() {
    let identity = test_identity();

    let first = compute_ntlm_v2_hash(&identity).unwrap();
    let second = compute_ntlm_v2_hash(&identity).unwrap();

    assert_eq!(HASH_SIZE, first.len());
    assert_eq!(first, second);
}

// MS-NLMP 4.2.4.1.1: NTOWFv2 for User/Password/Domain.
#[test]
fn ntlm_v2_hash_matches_the_protocol_example() {
    let identity = test_identity();

    assert_eq!(
        [
            0x0c, 0x86, 0x8a, 0x40, 0x3b, 0xfd, 0x7a, 0x93, 0xa3, 0x00, 0x1e, 0xf2, 0x2e, 0xf0,
            0x2e, 0x3f
        ],
        compute_ntlm_v2_hash(&identity).unwrap()
    );
}

#[test]
fn ntlm_v2_hash_uppercases_only_the_user() {
    let mut lowered = test_identity();
    lowered.user = crate::utils::string_to_utf16("user");

    assert_eq!(
        compute_ntlm_v2_hash(&test_identity()).unwrap(),
        compute_ntlm_v2_hash(&lowered).unwrap()
    );

    let mut lowered_domain = test_identity();
    lowered_domain.domain = crate::utils::string_to_utf16("domain");

    assert_ne!(
        compute_ntlm_v2_hash(&test_identity()).unwrap(),
        compute_ntlm_v2_hash(&lowered_domain).unwrap()
    );
}

#[test]
fn empty_identity_is_rejected() {
    let identity = CredentialsBuffers::default();

    assert!(compute_ntlm_v2_hash(&identity).is_err());
}

#[test]
fn lm_v2_response_is_hmac_then_client_challenge() {
    let client_challenge = [0x01; CHALLENGE_SIZE];
    let server_challenge = [0x02; CHALLENGE_SIZE];
    let hash = compute_ntlm_v2_hash(&test_identity()).unwrap();

    let response =
        compute_lm_v2_response(&client_challenge, &server_challenge, &hash).unwrap();

    assert_eq!(HASH_SIZE + CHALLENGE_SIZE, response.len());
    assert_eq!(client_challenge, response[HASH_SIZE..]);

    let mut data = server_challenge.to_vec();
    data.extend_from_slice(&client_challenge);
    assert_eq!(
        compute_hmac_md5(&hash, &data).unwrap(),
        response[..HASH_SIZE]
    );
}

#[test]
fn ntlm_v2_response_starts_with_the_proof_string() {
    let client_challenge = [0x01; CHALLENGE_SIZE];
    let server_challenge = [0x02; CHALLENGE_SIZE];
    let hash = compute_ntlm_v2_hash(&test_identity()).unwrap();
    let target_info = get_authenticate_target_info(&[], true).unwrap();
    let timestamp = 0x01d1_0000_0000_0000;

    let (response, key_exchange_key) = compute_ntlm_v2_response(
        &client_challenge,
        &server_challenge,
        &target_info,
        &hash,
        timestamp,
    )
    .unwrap();

    let proof: [u8; HASH_SIZE] = response[..HASH_SIZE].try_into().unwrap();
    // temp begins right after the proof with RespType 1, HighRespType 1
    assert_eq!([0x01, 0x01, 0x00, 0x00], response[HASH_SIZE..HASH_SIZE + 4]);
    // the key exchange key is the session base key
    assert_eq!(compute_hmac_md5(&hash, &proof).unwrap(), key_exchange_key);
}

#[test]
fn challenge_timestamp_is_taken_from_the_target_info() {
    let av_pairs = [AvPair::Timestamp(0x1234_5678), AvPair::EOL];
    let target_info = AvPair::list_to_buffer(&av_pairs).unwrap();

    let (timestamp, mic_required) = get_challenge_timestamp(&target_info).unwrap();
    assert_eq!(0x1234_5678, timestamp);
    assert!(mic_required);
}

#[test]
fn missing_challenge_timestamp_generates_one_without_mic() {
    let target_info = AvPair::list_to_buffer(&[AvPair::EOL]).unwrap();

    let (timestamp, mic_required) = get_challenge_timestamp(&target_info).unwrap();
    assert!(timestamp > FILETIME_UNIX_EPOCH_DELTA);
    assert!(!mic_required);
}

#[test]
fn authenticate_target_info_announces_the_mic() {
    let av_pairs = [
        AvPair::NbDomainName(b"D".to_vec()),
        AvPair::Timestamp(1),
        AvPair::EOL,
    ];
    let challenge_target_info = AvPair::list_to_buffer(&av_pairs).unwrap();

    let target_info = get_authenticate_target_info(&challenge_target_info, true).unwrap();

    let parsed = AvPair::buffer_to_av_pairs(&target_info).unwrap();
    assert!(parsed
        .iter()
        .any(|av_pair| *av_pair == AvPair::Flags(MsvAvFlags::MESSAGE_INTEGRITY_CHECK.bits())));
    // the trailing EOL pair plus four reserved zero bytes
    assert_eq!([0x00; 8], target_info[target_info.len() - 8..]);
}

#[test]
fn generated_timestamp_is_after_the_unix_epoch() {
    assert!(generate_timestamp() > FILETIME_UNIX_EPOCH_DELTA);
}
