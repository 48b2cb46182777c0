use super::*;

const REQUEST_WITH_COOKIE_BUFFER: [u8; 42] = [
    0x03, 0x00, 0x00, 0x2a, // tpkt
    0x25, 0xe0, 0x00, 0x00, 0x00, 0x00, 0x00, // tpdu
    0x43, 0x6f, 0x6f, 0x6b, 0x69, 0x65, 0x3a, 0x20, 0x6d, 0x73, 0x74, 0x73, 0x68, 0x61, 0x73,
    0x68, 0x3d, 0x55, 0x73, 0x65, 0x72, 0x0d, 0x0a, // cookie
    0x01, 0x00, 0x08, 0x00, 0x03, 0x00, 0x00, 0x00, // RDP_NEG_REQ
];

const RESPONSE_BUFFER: [u8; 19] = [
    0x03, 0x00, 0x00, 0x13, // tpkt
    0x0e, 0xd0, 0x00, 0x00, 0x12, 0x34, 0x00, // tpdu
    0x02, 0x1F, 0x08, 0x00, 0x02, 0x00, 0x00, 0x00, // RDP_NEG_RSP
];

const FAILURE_BUFFER: [u8; 19] = [
    0x03, 0x00, 0x00, 0x13, // tpkt
    0x0e, 0xd0, 0x00, 0x00, 0x12, 0x34, 0x00, // tpdu
    0x03, 0x00, 0x08, 0x00, 0x05, 0x00, 0x00, 0x00, // RDP_NEG_FAILURE
];

#[test]
fn request_with_cookie_serializes_correctly() {
    let request = Request {
        nego_data: Some(NegoData::Cookie(String::from("User"))),
        flags: RequestFlags::empty(),
        protocol: SecurityProtocol::HYBRID | SecurityProtocol::SSL,
        src_ref: 0,
    };

    let mut buffer = Vec::new();
    request.to_buffer(&mut buffer).unwrap();

    assert_eq!(REQUEST_WITH_COOKIE_BUFFER.to_vec(), buffer);
    assert_eq!(REQUEST_WITH_COOKIE_BUFFER.len(), request.buffer_length());
}

#[test]
fn request_round_trips() {
    let request = Request::from_buffer(REQUEST_WITH_COOKIE_BUFFER.as_ref()).unwrap();

    assert_eq!(
        Some(NegoData::Cookie(String::from("User"))),
        request.nego_data
    );
    assert_eq!(
        SecurityProtocol::HYBRID | SecurityProtocol::SSL,
        request.protocol
    );
}

#[test]
fn response_carries_selected_protocol() {
    let response = Response::from_buffer(RESPONSE_BUFFER.as_ref()).unwrap();

    match response.response {
        Some(ResponseData::Response { protocol, flags }) => {
            assert_eq!(SecurityProtocol::HYBRID, protocol);
            assert!(flags.contains(ResponseFlags::EXTENDED_CLIENT_DATA_SUPPORTED));
        }
        _ => panic!("expected a successful negotiation response"),
    }
}

#[test]
fn failure_response_surfaces_the_failure_code() {
    match Response::from_buffer(FAILURE_BUFFER.as_ref()) {
        Err(NegotiationError::ResponseFailure(code)) => {
            assert_eq!(FailureCode::HybridRequiredByServer, code);
            assert_eq!("the server requires NLA (CredSSP) security", code.description());
        }
        _ => panic!("expected a negotiation failure"),
    }
}

#[test]
fn request_without_routing_line_parses() {
    let request = Request {
        nego_data: None,
        flags: RequestFlags::empty(),
        protocol: SecurityProtocol::SSL,
        src_ref: 0,
    };

    let mut buffer = Vec::new();
    request.to_buffer(&mut buffer).unwrap();

    assert_eq!(request, Request::from_buffer(buffer.as_slice()).unwrap());
}
