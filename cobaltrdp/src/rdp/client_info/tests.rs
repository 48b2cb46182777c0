use super::*;

fn test_client_info() -> ClientInfo {
    ClientInfo {
        credentials: Credentials::new(
            String::from("User"),
            String::from("Password"),
            Some(String::from("DOMAIN")),
        ),
        code_page: 0,
        flags: ClientInfoFlags::UNICODE | ClientInfoFlags::MOUSE,
        compression_type: CompressionType::K8,
        alternate_shell: String::new(),
        work_dir: String::new(),
        extra_info: ExtendedClientInfo {
            address_family: AddressFamily::INet,
            address: String::from("192.0.2.17"),
            dir: String::new(),
            optional_data: ExtendedClientOptionalInfo::default(),
        },
    }
}

#[test]
fn client_info_round_trips() {
    let client_info = test_client_info();

    let mut buffer = Vec::new();
    client_info.to_buffer(&mut buffer).unwrap();
    assert_eq!(client_info.buffer_length(), buffer.len());

    assert_eq!(
        client_info,
        ClientInfo::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn client_info_round_trips_with_optional_tail() {
    let mut client_info = test_client_info();
    client_info.extra_info.optional_data = ExtendedClientOptionalInfo {
        timezone: Some(TimezoneInfo::default()),
        session_id: Some(0),
        performance_flags: Some(PerformanceFlags::DISABLE_WALLPAPER),
    };

    let mut buffer = Vec::new();
    client_info.to_buffer(&mut buffer).unwrap();
    assert_eq!(client_info.buffer_length(), buffer.len());

    assert_eq!(
        client_info,
        ClientInfo::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn rail_flag_survives_the_round_trip() {
    let mut client_info = test_client_info();
    client_info.flags |= ClientInfoFlags::RAIL;
    client_info.alternate_shell = String::from("||notepad");

    let mut buffer = Vec::new();
    client_info.to_buffer(&mut buffer).unwrap();

    let parsed = ClientInfo::from_buffer(buffer.as_slice()).unwrap();
    assert!(parsed.flags.contains(ClientInfoFlags::RAIL));
    assert_eq!("||notepad", parsed.alternate_shell);
}

#[test]
fn credentials_are_utf16_when_the_unicode_flag_is_set() {
    let client_info = test_client_info();

    let mut buffer = Vec::new();
    client_info.to_buffer(&mut buffer).unwrap();

    let expected_user = crate::utils::string_to_utf16("User");
    assert!(buffer
        .windows(expected_user.len())
        .any(|window| window == expected_user.as_slice()));
}
