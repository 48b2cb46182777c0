use super::*;

const DATA_PDU_BUFFER: [u8; 7] = [0x03, 0x00, 0x00, 0x0c, 0x02, 0xf0, 0x80];

#[test]
fn tpkt_header_round_trips() {
    let header = TpktHeader::new(0x1c);

    let mut buffer = Vec::new();
    header.to_buffer(&mut buffer).unwrap();
    assert_eq!(vec![0x03, 0x00, 0x00, 0x1c], buffer);

    assert_eq!(header, TpktHeader::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn tpkt_header_with_wrong_version_is_rejected() {
    let buffer = [0x02, 0x00, 0x00, 0x0c];

    assert!(TpktHeader::from_buffer(buffer.as_ref()).is_err());
}

#[test]
fn tpkt_record_boundary_survives_concatenation() {
    // three back-to-back records, one of them empty
    let payloads: [&[u8]; 3] = [b"first", b"", b"third payload"];

    let mut wire = Vec::new();
    for payload in payloads {
        TpktHeader::new(TPKT_HEADER_LENGTH + payload.len())
            .to_buffer(&mut wire)
            .unwrap();
        wire.extend_from_slice(payload);
    }

    let mut stream = wire.as_slice();
    for expected in payloads {
        let header = TpktHeader::from_buffer(&mut stream).unwrap();
        let payload_length = header.length - TPKT_HEADER_LENGTH;

        let (payload, rest) = stream.split_at(payload_length);
        assert_eq!(expected, payload);
        stream = rest;
    }
    assert!(stream.is_empty());
}

#[test]
fn empty_tpkt_record_has_length_four() {
    let mut buffer = Vec::new();
    TpktHeader::new(TPKT_HEADER_LENGTH).to_buffer(&mut buffer).unwrap();

    let header = TpktHeader::from_buffer(buffer.as_slice()).unwrap();
    assert_eq!(TPKT_HEADER_LENGTH, header.length);
}

#[test]
fn data_tpdu_round_trips() {
    let data = Data::new(0x0c - TPKT_HEADER_LENGTH - TPDU_DATA_HEADER_LENGTH);

    let mut buffer = Vec::new();
    data.to_buffer(&mut buffer).unwrap();
    assert_eq!(DATA_PDU_BUFFER.to_vec(), buffer);

    assert_eq!(data, Data::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn data_tpdu_with_undersized_tpkt_length_is_rejected() {
    let buffer = [0x03, 0x00, 0x00, 0x05, 0x02, 0xf0, 0x80];

    assert!(Data::from_buffer(buffer.as_ref()).is_err());
}

#[test]
fn unexpected_tpdu_code_is_rejected() {
    let buffer = [0x02, 0xe0, 0x00];

    assert!(read_and_check_tpdu_header(buffer.as_ref(), X224TPDUType::Data).is_err());
}
