use super::*;

#[test]
fn header_with_one_byte_length_parses() {
    // flags = none, 1 event, total length 0x08
    let buffer = [0x04, 0x08, 0xde, 0xad, 0xbe, 0xef, 0x00, 0x00];

    let (header, length) = parse_fast_path_header(buffer.as_ref()).unwrap();

    assert_eq!(8, length);
    assert_eq!(1, header.number_of_events);
    assert_eq!(0, header.encryption_flags);
    assert_eq!(6, header.data_length);
}

#[test]
fn header_with_two_byte_length_parses() {
    let buffer = [0x00, 0x81, 0x2a];

    let (header, length) = parse_fast_path_header(buffer.as_ref()).unwrap();

    assert_eq!(0x12a, length);
    assert_eq!(0x12a - 3, header.data_length);
}

#[test]
fn null_length_record_is_rejected() {
    let buffer = [0x00, 0x01];

    assert!(matches!(
        parse_fast_path_header(buffer.as_ref()),
        Err(FastPathError::NullLength { bytes_read: 2 })
    ));
}

#[test]
fn first_byte_discriminates_fast_path_from_x224() {
    assert!(is_fast_path_byte(0x00));
    assert!(is_fast_path_byte(0x04));
    assert!(is_fast_path_byte(0xc4));
    assert!(!is_fast_path_byte(0x03));
}

#[test]
fn update_pdu_round_trips() {
    let pdu = FastPathUpdatePdu {
        update_code: UpdateCode::Bitmap,
        fragmentation: Fragmentation::Single,
        compression_flags: None,
        data: vec![0xde, 0xad, 0xbe, 0xef],
    };

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(vec![0x01, 0x04, 0x00, 0xde, 0xad, 0xbe, 0xef], buffer);
    assert_eq!(pdu.buffer_length(), buffer.len());

    assert_eq!(pdu, FastPathUpdatePdu::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn update_pdu_with_compression_flags_round_trips() {
    let pdu = FastPathUpdatePdu {
        update_code: UpdateCode::SurfaceCommands,
        fragmentation: Fragmentation::First,
        compression_flags: Some(0x20),
        data: vec![0x01, 0x02],
    };

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();

    assert_eq!(pdu, FastPathUpdatePdu::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn invalid_update_code_is_rejected() {
    let buffer = [0x0f, 0x00, 0x00];

    assert!(matches!(
        FastPathUpdatePdu::from_buffer(buffer.as_ref()),
        Err(FastPathError::InvalidUpdateCode(0x0f))
    ));
}

#[test]
fn input_record_has_event_count_in_high_bits() {
    let mut buffer = Vec::new();
    write_fast_path_input(&mut buffer, 1, &[0xaa, 0xbb]).unwrap();

    assert_eq!(vec![0x04, 0x04, 0xaa, 0xbb], buffer);
    assert!(is_fast_path_byte(buffer[0]));
}

#[test]
fn long_input_record_uses_two_byte_length() {
    let events = vec![0x00; 0x90];

    let mut buffer = Vec::new();
    write_fast_path_input(&mut buffer, 2, &events).unwrap();

    assert_eq!(0x08, buffer[0]);
    // 0x90 bytes of events + 1 header byte + 2 length bytes
    assert_eq!([0x80 | 0x00, 0x93], [buffer[1] & 0x80, buffer[2]]);
    assert_eq!(0x93, ((u16::from(buffer[1]) & !0x80) << 8) | u16::from(buffer[2]));
}
