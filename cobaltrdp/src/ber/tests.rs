use std::io;

use super::*;

fn write_length_to_vec(length: u16) -> Vec<u8> {
    let mut buffer = Vec::new();
    write_length(&mut buffer, length).unwrap();

    buffer
}

// BER length boundaries: short form through 0x7F, one-octet long form
// through 0xFF, two-octet long form above.
#[test]
fn length_encoding_follows_short_and_long_form_rules() {
    assert_eq!(vec![0x00], write_length_to_vec(0));
    assert_eq!(vec![0x7F], write_length_to_vec(127));
    assert_eq!(vec![0x81, 0x80], write_length_to_vec(128));
    assert_eq!(vec![0x81, 0xFF], write_length_to_vec(255));
    assert_eq!(vec![0x82, 0x01, 0x00], write_length_to_vec(256));
    assert_eq!(vec![0x82, 0xFF, 0xFF], write_length_to_vec(65535));
}

#[test]
fn length_round_trips_at_boundaries() {
    for length in [0, 127, 128, 255, 256, 65535] {
        let buffer = write_length_to_vec(length);

        assert_eq!(length, read_length(buffer.as_slice()).unwrap());
        assert_eq!(buffer.len(), sizeof_length(length) as usize);
    }
}

#[test]
fn sequence_tag_round_trips() {
    let mut buffer = Vec::new();
    assert_eq!(4, write_sequence_tag(&mut buffer, 0x100).unwrap());
    assert_eq!(vec![0x30, 0x82, 0x01, 0x00], buffer);

    assert_eq!(0x100, read_sequence_tag(buffer.as_slice()).unwrap());
}

#[test]
fn sequence_tag_with_wrong_identifier_is_rejected() {
    let buffer = [0x3a, 0x82, 0x01, 0x00];

    assert!(read_sequence_tag(buffer.as_ref()).is_err());
}

#[test]
fn application_tag_round_trips_with_long_tag_number() {
    let mut buffer = Vec::new();
    assert_eq!(3, write_application_tag(&mut buffer, 0x1F, 0x0F).unwrap());
    assert_eq!(vec![0x7F, 0x1F, 0x0F], buffer);

    assert_eq!(0x0F, read_application_tag(buffer.as_slice(), 0x1F).unwrap());
}

#[test]
fn application_tag_round_trips_with_short_tag_number() {
    let mut buffer = Vec::new();
    assert_eq!(4, write_application_tag(&mut buffer, 0x08, 0x100).unwrap());
    assert_eq!(vec![0x68, 0x82, 0x01, 0x00], buffer);

    assert_eq!(0x100, read_application_tag(buffer.as_slice(), 0x08).unwrap());
}

#[test]
fn integer_round_trips_each_width() {
    for (value, expected_size) in [
        (0x79u32, 3usize),
        (0x800, 4),
        (0x8_0000, 5),
        (0x0080_0000, 6),
        (0xFFFF_FFFF, 6),
    ] {
        let mut buffer = Vec::new();
        assert_eq!(expected_size, write_integer(&mut buffer, value).unwrap());
        assert_eq!(expected_size, sizeof_integer(value) as usize);

        assert_eq!(u64::from(value), read_integer(buffer.as_slice()).unwrap());
    }
}

#[test]
fn bool_round_trips() {
    for value in [true, false] {
        let mut buffer = Vec::new();
        write_bool(&mut buffer, value).unwrap();

        assert_eq!(value, read_bool(buffer.as_slice()).unwrap());
    }
}

#[test]
fn octet_string_round_trips() {
    let value = [0x68, 0x65, 0x6c, 0x6c, 0x6f];

    let mut buffer = Vec::new();
    assert_eq!(7, write_octet_string(&mut buffer, value.as_ref()).unwrap());
    assert_eq!(vec![0x04, 0x05, 0x68, 0x65, 0x6c, 0x6c, 0x6f], buffer);

    assert_eq!(value.to_vec(), read_octet_string(buffer.as_slice()).unwrap());
}

#[test]
fn contextual_tag_probe_rewinds_on_mismatch() {
    let buffer = [0xA3, 0x02, 0x04, 0x00];
    let mut cursor = io::Cursor::new(buffer.as_ref());

    assert_eq!(
        None,
        read_contextual_tag_or_unwind(&mut cursor, 1, Pc::Construct).unwrap()
    );
    assert_eq!(0, cursor.position());

    assert_eq!(
        Some(0x02),
        read_contextual_tag_or_unwind(&mut cursor, 3, Pc::Construct).unwrap()
    );
}

#[test]
fn contextual_tag_probe_handles_eof() {
    let mut cursor = io::Cursor::new(&[] as &[u8]);

    assert_eq!(
        None,
        read_contextual_tag_or_unwind(&mut cursor, 0, Pc::Construct).unwrap()
    );
}
