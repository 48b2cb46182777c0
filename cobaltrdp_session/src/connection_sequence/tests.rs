use std::io::{self, Read, Write};

use cobaltrdp::rdp::finalization_messages::{ControlPdu, FontPdu, SynchronizePdu};
use cobaltrdp::rdp::headers::{
    ShareControlHeader, ShareControlPdu, ShareDataHeader, ShareDataPdu,
};
use cobaltrdp::ControlAction;

use super::*;

/// A scripted peer: reads come from the prepared buffer, writes are captured.
struct TestStream {
    inbound: io::Cursor<Vec<u8>>,
    outbound: Vec<u8>,
}

impl TestStream {
    fn new(inbound: Vec<u8>) -> Self {
        Self {
            inbound: io::Cursor::new(inbound),
            outbound: Vec::new(),
        }
    }
}

impl Read for TestStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inbound.read(buf)
    }
}

impl Write for TestStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.outbound.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn connection_confirm_buffer(protocol: SecurityProtocol) -> Vec<u8> {
    let response = nego::Response {
        response: Some(nego::ResponseData::Response {
            flags: nego::ResponseFlags::empty(),
            protocol,
        }),
        dst_ref: 0,
        src_ref: 0,
    };

    let mut buffer = Vec::new();
    response.to_buffer(&mut buffer).unwrap();

    buffer
}

fn wrap_send_data_indication(share_data_pdu: ShareDataPdu) -> Vec<u8> {
    let share_control_header = ShareControlHeader::new(
        ShareControlPdu::Data(ShareDataHeader::new(share_data_pdu)),
        1002,
        0x0001_03ea,
    );

    let mut pdu = Vec::with_capacity(share_control_header.buffer_length());
    share_control_header.to_buffer(&mut pdu).unwrap();

    let send_data_context = cobaltrdp::mcs::SendDataContext::new(1002, 1003, pdu.len());
    let mcs_pdu = McsPdu::SendDataIndication(send_data_context);

    let mut mcs_buffer = Vec::with_capacity(mcs_pdu.buffer_length() + pdu.len());
    mcs_pdu.to_buffer(&mut mcs_buffer).unwrap();
    mcs_buffer.extend_from_slice(pdu.as_slice());

    let mut buffer = Vec::new();
    cobaltrdp::x224::Data::new(mcs_buffer.len())
        .to_buffer(&mut buffer)
        .unwrap();
    buffer.extend_from_slice(mcs_buffer.as_slice());

    buffer
}

#[test]
fn negotiation_returns_the_selected_protocol() {
    let mut stream = TestStream::new(connection_confirm_buffer(SecurityProtocol::HYBRID));

    let selected = process_negotiation(
        &mut stream,
        String::from("User"),
        SecurityProtocol::HYBRID | SecurityProtocol::SSL,
    )
    .unwrap();

    assert_eq!(SecurityProtocol::HYBRID, selected);
    // the request went out as a TPKT record
    assert_eq!(0x03, stream.outbound[0]);
}

#[test]
fn negotiation_rejects_a_protocol_that_was_not_requested() {
    let mut stream = TestStream::new(connection_confirm_buffer(SecurityProtocol::RDSTLS));

    let result = process_negotiation(
        &mut stream,
        String::from("User"),
        SecurityProtocol::HYBRID | SecurityProtocol::SSL,
    );

    assert!(matches!(result, Err(RdpError::InvalidResponse(_))));
}

#[test]
fn negotiation_failure_code_surfaces_as_a_negotiation_error() {
    let failure = nego::Response {
        response: Some(nego::ResponseData::Failure {
            code: nego::FailureCode::HybridRequiredByServer,
        }),
        dst_ref: 0,
        src_ref: 0,
    };
    let mut buffer = Vec::new();
    failure.to_buffer(&mut buffer).unwrap();

    let mut stream = TestStream::new(buffer);

    let result = process_negotiation(&mut stream, String::from("User"), SecurityProtocol::SSL);

    assert!(matches!(
        result,
        Err(RdpError::NegotiationError(
            nego::NegotiationError::ResponseFailure(nego::FailureCode::HybridRequiredByServer)
        ))
    ));
}

#[test]
fn licensing_pdu_in_enhanced_mode_is_accepted() {
    // the exact valid-client license packet an xrdp-style server sends
    let license_pdu = [
        0x80, 0x00, 0x00, 0x00, 0xff, 0x02, 0x14, 0x00, 0x07, 0x00, 0x00, 0x00, 0x02, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    let send_data_context = cobaltrdp::mcs::SendDataContext::new(1002, 1003, license_pdu.len());
    let mcs_pdu = McsPdu::SendDataIndication(send_data_context);
    let mut mcs_buffer = Vec::new();
    mcs_pdu.to_buffer(&mut mcs_buffer).unwrap();
    mcs_buffer.extend_from_slice(license_pdu.as_ref());

    let mut inbound = Vec::new();
    cobaltrdp::x224::Data::new(mcs_buffer.len())
        .to_buffer(&mut inbound)
        .unwrap();
    inbound.extend_from_slice(mcs_buffer.as_slice());

    let mut stream = TestStream::new(inbound);
    let mut transport = SendDataContextTransport::new(1007, 1003);

    process_server_license_exchange(&mut stream, &mut transport).unwrap();
}

#[test]
fn finalization_completes_with_the_expected_sequence() {
    let mut inbound = Vec::new();
    inbound.extend(wrap_send_data_indication(ShareDataPdu::Synchronize(
        SynchronizePdu::new(1002),
    )));
    inbound.extend(wrap_send_data_indication(ShareDataPdu::Control(
        ControlPdu::new(ControlAction::Cooperate),
    )));
    inbound.extend(wrap_send_data_indication(ShareDataPdu::Control(
        ControlPdu {
            action: ControlAction::GrantedControl,
            grant_id: 1007,
            control_id: 0x03ea,
        },
    )));
    inbound.extend(wrap_send_data_indication(ShareDataPdu::FontMap(
        FontPdu::default(),
    )));

    let mut stream = TestStream::new(inbound);
    let mut transport = ShareDataHeaderTransport::new(ShareControlHeaderTransport::new(
        SendDataContextTransport::new(1007, 1003),
        1007,
        true,
    ));

    process_finalization(&mut stream, &mut transport, 1007).unwrap();

    // four PDUs went out: synchronize, cooperate, request control, font list
    assert!(!stream.outbound.is_empty());
}

#[test]
fn finalization_rejects_out_of_order_pdus() {
    let inbound = wrap_send_data_indication(ShareDataPdu::FontMap(FontPdu::default()));

    let mut stream = TestStream::new(inbound);
    let mut transport = ShareDataHeaderTransport::new(ShareControlHeaderTransport::new(
        SendDataContextTransport::new(1007, 1003),
        1007,
        true,
    ));

    let result = process_finalization(&mut stream, &mut transport, 1007);

    assert!(matches!(result, Err(RdpError::UnexpectedPdu(_))));
}

#[test]
fn client_info_pdu_respects_the_enhanced_security_rule() {
    let config = crate::config::SessionConfig::new(cobaltrdp::Credentials::new(
        String::from("User"),
        String::from("Password"),
        None,
    ));

    let mut enhanced_stream = TestStream::new(Vec::new());
    let mut transport = SendDataContextTransport::new(1007, 1003);
    send_client_info(&mut enhanced_stream, &mut transport, &config, "10.0.0.1", true).unwrap();

    let mut basic_stream = TestStream::new(Vec::new());
    send_client_info(&mut basic_stream, &mut transport, &config, "10.0.0.1", false).unwrap();

    // the basic-security variant carries the 4-byte security header extra
    assert_eq!(
        enhanced_stream.outbound.len() + 4,
        basic_stream.outbound.len()
    );
}
