use super::*;

#[test]
fn length_uses_one_byte_up_to_0x7f() {
    let mut buffer = Vec::new();
    assert_eq!(1, write_length(&mut buffer, 0x7f).unwrap());
    assert_eq!(vec![0x7f], buffer);

    assert_eq!((0x7f, 1), read_length(buffer.as_slice()).unwrap());
}

#[test]
fn length_uses_two_bytes_above_0x7f() {
    let mut buffer = Vec::new();
    assert_eq!(2, write_length(&mut buffer, 0x80).unwrap());
    assert_eq!(vec![0x80, 0x80], buffer);

    assert_eq!((0x80, 2), read_length(buffer.as_slice()).unwrap());
}

#[test]
fn u16_is_offset_by_the_constrained_minimum() {
    let mut buffer = Vec::new();
    write_u16(&mut buffer, 1003, 1001).unwrap();
    assert_eq!(vec![0x00, 0x02], buffer);

    assert_eq!(1003, read_u16(buffer.as_slice(), 1001).unwrap());
}

#[test]
fn u16_below_minimum_is_rejected() {
    let mut buffer = Vec::new();

    assert!(write_u16(&mut buffer, 1000, 1001).is_err());
}

#[test]
fn u16_read_overflow_is_rejected() {
    let buffer = [0xff, 0xff];

    assert!(read_u16(buffer.as_ref(), 1001).is_err());
}

#[test]
fn u32_round_trips_each_width() {
    for value in [0u32, 0xff, 0x100, 0xffff, 0x0001_0000, 0xffff_ffff] {
        let mut buffer = Vec::new();
        write_u32(&mut buffer, value).unwrap();

        assert_eq!(value, read_u32(buffer.as_slice()).unwrap());
    }
}

#[test]
fn object_id_round_trips() {
    let object_id = [0, 0, 20, 124, 0, 1];

    let mut buffer = Vec::new();
    write_object_id(&mut buffer, object_id).unwrap();

    assert_eq!(object_id, read_object_id(buffer.as_slice()).unwrap());
}

#[test]
fn enum_outside_range_is_rejected() {
    let buffer = [16u8];

    assert!(read_enum(buffer.as_ref(), 16).is_err());
    assert_eq!(15, read_enum([15u8].as_ref(), 16).unwrap());
}

#[test]
fn octet_string_round_trips_with_minimum() {
    let value = b"Duca";

    let mut buffer = Vec::new();
    write_octet_string(&mut buffer, value, 4).unwrap();

    assert_eq!(value.to_vec(), read_octet_string(buffer.as_slice(), 4).unwrap());
}
