use super::*;

// the canonical valid-client reply of a licensing-free server
const VALID_CLIENT_BUFFER: [u8; 16] = [
    0xff, 0x03, 0x10, 0x00, // preamble: ERROR_ALERT, version 3, size
    0x07, 0x00, 0x00, 0x00, // STATUS_VALID_CLIENT
    0x02, 0x00, 0x00, 0x00, // ST_NO_TRANSITION
    0x04, 0x00, 0x00, 0x00, // error info blob: BB_ERROR_BLOB, empty
];

#[test]
fn valid_client_error_alert_is_accepted() {
    let license = ServerLicense::from_buffer(VALID_CLIENT_BUFFER.as_ref()).unwrap();

    assert_eq!(
        ServerLicense::ValidClient(LicensingErrorMessage::valid_client()),
        license
    );
}

#[test]
fn valid_client_round_trips() {
    let license = ServerLicense::ValidClient(LicensingErrorMessage::valid_client());

    let mut buffer = Vec::new();
    license.to_buffer(&mut buffer).unwrap();
    assert_eq!(VALID_CLIENT_BUFFER.to_vec(), buffer);
    assert_eq!(VALID_CLIENT_BUFFER.len(), license.buffer_length());
}

#[test]
fn new_license_is_accepted() {
    let buffer = [0x03, 0x03, 0x04, 0x00];

    assert_eq!(
        ServerLicense::NewLicense,
        ServerLicense::from_buffer(buffer.as_ref()).unwrap()
    );
}

#[test]
fn other_error_codes_are_rejected() {
    let mut buffer = VALID_CLIENT_BUFFER;
    buffer[4] = 0x02; // ERR_NO_LICENSE

    assert!(matches!(
        ServerLicense::from_buffer(buffer.as_ref()),
        Err(ServerLicenseError::UnexpectedError(_))
    ));
}

#[test]
fn wrong_state_transition_is_rejected() {
    let mut buffer = VALID_CLIENT_BUFFER;
    buffer[8] = 0x01; // ST_TOTAL_ABORT

    assert!(matches!(
        ServerLicense::from_buffer(buffer.as_ref()),
        Err(ServerLicenseError::UnexpectedError(_))
    ));
}

#[test]
fn handshake_license_messages_are_rejected() {
    let buffer = [0x01, 0x03, 0x04, 0x00];

    assert!(matches!(
        ServerLicense::from_buffer(buffer.as_ref()),
        Err(ServerLicenseError::UnexpectedLicenseMessage(
            PreambleType::LicenseRequest
        ))
    ));
}
