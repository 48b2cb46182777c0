use std::collections::HashMap;
use std::io;

use cobaltrdp::rdp::headers::{
    DeactivateAllPdu, ShareControlHeader, ShareControlPdu, ShareDataHeader, SlowPathUpdateType,
    UpdatePdu,
};
use cobaltrdp::rdp::server_error_info::ServerSetErrorInfoPdu;
use cobaltrdp::PduParsing;

use super::*;
use crate::config::RemoteApp;

const INITIATOR_ID: u16 = 1007;
const GLOBAL_CHANNEL_ID: u16 = 1003;
const RAIL_CHANNEL_ID: u16 = 1005;

fn test_processor(rail: Option<RailHandler>) -> Processor {
    let mut channel_names = HashMap::new();
    channel_names.insert(GLOBAL_CHANNEL_ID, String::from("global"));
    channel_names.insert(RAIL_CHANNEL_ID, String::from(RAIL_CHANNEL_NAME));

    let transport = ShareControlHeaderTransport::new(
        crate::transport::SendDataContextTransport::new(INITIATOR_ID, GLOBAL_CHANNEL_ID),
        INITIATOR_ID,
        true,
    );

    Processor::new(
        channel_names,
        INITIATOR_ID,
        GLOBAL_CHANNEL_ID,
        transport,
        rail,
        None,
    )
}

fn global_ids() -> ChannelIdentificators {
    ChannelIdentificators {
        initiator_id: 1002,
        channel_id: GLOBAL_CHANNEL_ID,
    }
}

fn share_control_pdu_buffer(share_control_pdu: ShareControlPdu) -> Vec<u8> {
    let header = ShareControlHeader::new(share_control_pdu, 1002, 0x0001_03ea);

    let mut buffer = Vec::with_capacity(header.buffer_length());
    header.to_buffer(&mut buffer).unwrap();

    buffer
}

#[test]
fn slow_path_bitmap_update_is_normalized_into_a_fast_path_frame() {
    let pdu = share_control_pdu_buffer(ShareControlPdu::Data(ShareDataHeader::new(
        ShareDataPdu::Update(UpdatePdu {
            update_type: SlowPathUpdateType::Bitmap,
            data: vec![0xde, 0xad, 0xbe, 0xef],
        }),
    )));

    let mut stream = io::Cursor::new(Vec::new());
    let event = test_processor(None)
        .process(&mut stream, global_ids(), pdu.as_slice())
        .unwrap();

    match event {
        Some(SessionEvent::Update(frame)) => {
            assert_eq!(
                vec![0x01, 0x06, 0x00, 0x01, 0x00, 0xde, 0xad, 0xbe, 0xef],
                frame.data
            );
        }
        event => panic!("expected an update frame, got {:?}", event),
    }
}

#[test]
fn deactivate_all_surfaces_the_session_end() {
    let pdu = share_control_pdu_buffer(ShareControlPdu::ServerDeactivateAll(DeactivateAllPdu {
        source_descriptor: Vec::new(),
    }));

    let mut stream = io::Cursor::new(Vec::new());
    let event = test_processor(None)
        .process(&mut stream, global_ids(), pdu.as_slice())
        .unwrap();

    assert_eq!(Some(SessionEvent::SessionEnded), event);
}

#[test]
fn error_info_is_consumed_without_an_event() {
    let pdu = share_control_pdu_buffer(ShareControlPdu::Data(ShareDataHeader::new(
        ShareDataPdu::SetErrorInfo(ServerSetErrorInfoPdu {
            error_info: 0x0000_000B,
        }),
    )));

    let mut stream = io::Cursor::new(Vec::new());
    let event = test_processor(None)
        .process(&mut stream, global_ids(), pdu.as_slice())
        .unwrap();

    assert_eq!(None, event);
}

#[test]
fn rail_channel_data_is_ignored_without_a_remote_app() {
    let mut channel_data = Vec::new();
    cobaltrdp::rdp::vc::ChannelPduHeader::whole(4)
        .to_buffer(&mut channel_data)
        .unwrap();
    channel_data.extend_from_slice(&[0x05, 0x00, 0x08, 0x00]);

    let mut stream = io::Cursor::new(Vec::new());
    let event = test_processor(None)
        .process(
            &mut stream,
            ChannelIdentificators {
                initiator_id: 1002,
                channel_id: RAIL_CHANNEL_ID,
            },
            channel_data.as_slice(),
        )
        .unwrap();

    assert_eq!(None, event);
    assert!(stream.into_inner().is_empty());
}

#[test]
fn rail_handshake_produces_channel_replies() {
    let mut rail = RailHandler::new(RemoteApp {
        program: String::from("||notepad"),
        working_dir: String::new(),
        args: String::new(),
    });
    rail.start_initialization();

    // handshake order wrapped in a channel PDU header
    let mut rail_pdu = Vec::new();
    crate::rail::RailPduHeader {
        order_type: 0x0005,
        order_length: 8,
    }
    .to_buffer(&mut rail_pdu)
    .unwrap();
    rail_pdu.extend_from_slice(&0x1770u32.to_le_bytes());

    let mut channel_data = Vec::new();
    cobaltrdp::rdp::vc::ChannelPduHeader::whole(rail_pdu.len() as u32)
        .to_buffer(&mut channel_data)
        .unwrap();
    channel_data.extend_from_slice(rail_pdu.as_slice());

    let mut stream = io::Cursor::new(Vec::new());
    let event = test_processor(Some(rail))
        .process(
            &mut stream,
            ChannelIdentificators {
                initiator_id: 1002,
                channel_id: RAIL_CHANNEL_ID,
            },
            channel_data.as_slice(),
        )
        .unwrap();

    assert_eq!(None, event);
    // the handshake answer went out on the wire
    assert!(!stream.into_inner().is_empty());
}

#[test]
fn data_on_an_unknown_channel_is_an_error() {
    let mut stream = io::Cursor::new(Vec::new());

    let result = test_processor(None).process(
        &mut stream,
        ChannelIdentificators {
            initiator_id: 1002,
            channel_id: 0x4242,
        },
        &[],
    );

    assert!(matches!(result, Err(RdpError::UnexpectedChannel(0x4242))));
}
