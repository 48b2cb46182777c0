use super::*;

const ERECT_DOMAIN_PDU_BUFFER: [u8; 5] = [0x04, 0x01, 0x00, 0x01, 0x00];

const ATTACH_USER_REQUEST_PDU_BUFFER: [u8; 1] = [0x28];

const ATTACH_USER_CONFIRM_PDU_BUFFER: [u8; 4] = [0x2e, 0x00, 0x00, 0x06];

const CHANNEL_JOIN_REQUEST_PDU_BUFFER: [u8; 5] = [0x38, 0x00, 0x06, 0x03, 0xef];

const CHANNEL_JOIN_CONFIRM_PDU_BUFFER: [u8; 8] =
    [0x3e, 0x00, 0x00, 0x06, 0x03, 0xef, 0x03, 0xef];

const SEND_DATA_REQUEST_PDU_BUFFER: [u8; 7] = [0x64, 0x00, 0x06, 0x03, 0xeb, 0x70, 0x1a];

#[test]
fn erect_domain_request_round_trips() {
    let pdu = McsPdu::ErectDomainRequest(ErectDomainPdu {
        sub_height: 0,
        sub_interval: 0,
    });

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(ERECT_DOMAIN_PDU_BUFFER.to_vec(), buffer);

    assert_eq!(pdu, McsPdu::from_buffer(buffer.as_slice()).unwrap());
    assert_eq!(ERECT_DOMAIN_PDU_BUFFER.len(), pdu.buffer_length());
}

#[test]
fn attach_user_request_round_trips() {
    let pdu = McsPdu::AttachUserRequest;

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(ATTACH_USER_REQUEST_PDU_BUFFER.to_vec(), buffer);

    assert_eq!(pdu, McsPdu::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn attach_user_confirm_round_trips() {
    let pdu = McsPdu::AttachUserConfirm(AttachUserConfirmPdu {
        initiator_id: 1007,
        result: 0,
    });

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(ATTACH_USER_CONFIRM_PDU_BUFFER.to_vec(), buffer);

    assert_eq!(pdu, McsPdu::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn channel_join_request_round_trips() {
    let pdu = McsPdu::ChannelJoinRequest(ChannelJoinRequestPdu {
        initiator_id: 1007,
        channel_id: 1007,
    });

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(CHANNEL_JOIN_REQUEST_PDU_BUFFER.to_vec(), buffer);

    assert_eq!(pdu, McsPdu::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn channel_join_confirm_round_trips() {
    let pdu = McsPdu::ChannelJoinConfirm(ChannelJoinConfirmPdu {
        result: 0,
        initiator_id: 1007,
        requested_channel_id: 1007,
        channel_id: 1007,
    });

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(CHANNEL_JOIN_CONFIRM_PDU_BUFFER.to_vec(), buffer);

    assert_eq!(pdu, McsPdu::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn send_data_request_round_trips() {
    let pdu = McsPdu::SendDataRequest(SendDataContext::new(1007, 1003, 26));

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(SEND_DATA_REQUEST_PDU_BUFFER.to_vec(), buffer);

    assert_eq!(pdu, McsPdu::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn invalid_domain_pdu_choice_is_rejected() {
    let buffer = [0xff, 0x00];

    assert!(matches!(
        McsPdu::from_buffer(buffer.as_ref()),
        Err(McsError::InvalidDomainMcsPdu)
    ));
}
