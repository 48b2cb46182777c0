use cobaltrdp::fast_path::Fragmentation;

use super::*;

#[test]
fn bitmap_update_gets_the_synthetic_update_type_word() {
    // update header (bitmap, single), size 4, payload
    let payload = [0x01, 0x04, 0x00, 0xde, 0xad, 0xbe, 0xef];
    let header = FastPathHeader {
        encryption_flags: 0,
        number_of_events: 0,
        data_length: payload.len() as u16,
    };

    let frame = Processor::new().process(&header, payload.as_ref()).unwrap();

    assert_eq!(UpdateCode::Bitmap, frame.update_code);
    assert_eq!(
        vec![0x01, 0x06, 0x00, 0x01, 0x00, 0xde, 0xad, 0xbe, 0xef],
        frame.data
    );
}

#[test]
fn non_bitmap_updates_keep_their_payload() {
    let payload = [0x03, 0x00, 0x00];
    let header = FastPathHeader {
        encryption_flags: 0,
        number_of_events: 0,
        data_length: payload.len() as u16,
    };

    let frame = Processor::new().process(&header, payload.as_ref()).unwrap();

    assert_eq!(UpdateCode::Synchronize, frame.update_code);
    assert_eq!(vec![0x03, 0x00, 0x00], frame.data);
}

#[test]
fn size_fix_up_is_overflow_checked() {
    let update_pdu = FastPathUpdatePdu {
        update_code: UpdateCode::Bitmap,
        fragmentation: Fragmentation::Single,
        compression_flags: None,
        data: vec![0x00; usize::from(u16::max_value()) - 1],
    };

    assert!(matches!(
        normalize_fast_path_update(update_pdu),
        Err(crate::RdpError::FastPathError(FastPathError::SizeOverflow))
    ));
}
