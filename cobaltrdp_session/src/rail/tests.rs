use num_traits::ToPrimitive as _;

use super::*;

fn test_remote_app() -> RemoteApp {
    RemoteApp {
        program: String::from("||notepad"),
        working_dir: String::new(),
        args: String::new(),
    }
}

fn handler_in_initializing() -> RailHandler {
    let mut handler = RailHandler::new(test_remote_app());
    handler.start_initialization();

    handler
}

fn server_handshake() -> Vec<u8> {
    encode_rail_pdu(
        RailOrderType::Handshake,
        &HandshakePdu {
            build_number: 0x1770,
        },
    )
    .unwrap()
}

fn server_exec_result() -> Vec<u8> {
    encode_rail_pdu(
        RailOrderType::ExecResult,
        &ExecResultPdu {
            flags: 0,
            exec_result: 0,
            raw_result: 0,
        },
    )
    .unwrap()
}

fn server_sysparam() -> Vec<u8> {
    // a sysparam order body the handler never looks into
    let mut pdu = Vec::new();
    RailPduHeader {
        order_type: RailOrderType::SysparamUpdate.to_u16().unwrap(),
        order_length: 8,
    }
    .to_buffer(&mut pdu)
    .unwrap();
    pdu.extend_from_slice(&[0x00; 4]);

    pdu
}

#[test]
fn handshake_triggers_the_client_exchange_and_execute_state() {
    let mut handler = handler_in_initializing();

    let replies = handler.process(server_handshake().as_slice()).unwrap();

    assert_eq!(3, replies.len());
    assert_eq!(RailState::ExecuteApp, handler.state());

    // handshake, client status, exec, in that order
    let order_types: Vec<u16> = replies
        .iter()
        .map(|reply| {
            RailPduHeader::from_buffer(reply.as_slice())
                .unwrap()
                .order_type
        })
        .collect();
    assert_eq!(
        vec![
            RailOrderType::Handshake.to_u16().unwrap(),
            RailOrderType::ClientStatus.to_u16().unwrap(),
            RailOrderType::Exec.to_u16().unwrap(),
        ],
        order_types
    );
}

#[test]
fn exec_pdu_carries_the_remote_app_program() {
    let mut handler = handler_in_initializing();

    let replies = handler.process(server_handshake().as_slice()).unwrap();

    let exec_reply = replies.last().unwrap();
    let exec = ExecPdu::from_buffer(&exec_reply[RAIL_PDU_HEADER_SIZE..]).unwrap();
    assert_eq!("||notepad", exec.program);
}

#[test]
fn exec_result_advances_to_wait_for_data() {
    let mut handler = handler_in_initializing();
    handler.process(server_handshake().as_slice()).unwrap();

    let replies = handler.process(server_exec_result().as_slice()).unwrap();

    assert!(replies.is_empty());
    assert_eq!(RailState::WaitForData, handler.state());
}

#[test]
fn sysparams_are_ignored_in_every_state() {
    let mut handler = handler_in_initializing();

    assert!(handler.process(server_sysparam().as_slice()).unwrap().is_empty());
    assert_eq!(RailState::Initializing, handler.state());

    handler.process(server_handshake().as_slice()).unwrap();
    assert!(handler.process(server_sysparam().as_slice()).unwrap().is_empty());
    assert_eq!(RailState::ExecuteApp, handler.state());
}

#[test]
fn handshake_outside_initializing_is_ignored() {
    let mut handler = RailHandler::new(test_remote_app());

    // still Uninitialized: nothing must happen
    let replies = handler.process(server_handshake().as_slice()).unwrap();

    assert!(replies.is_empty());
    assert_eq!(RailState::Uninitialized, handler.state());
}

#[test]
fn unknown_orders_do_not_wedge_the_channel() {
    let mut handler = handler_in_initializing();

    let mut pdu = Vec::new();
    RailPduHeader {
        order_type: 0x4242,
        order_length: 4,
    }
    .to_buffer(&mut pdu)
    .unwrap();

    assert!(handler.process(pdu.as_slice()).unwrap().is_empty());
    assert_eq!(RailState::Initializing, handler.state());
}

#[test]
fn exec_pdu_round_trips() {
    let exec = ExecPdu {
        flags: 0,
        program: String::from("||calc"),
        working_dir: String::from("C:\\"),
        args: String::from("--switch"),
    };

    let mut buffer = Vec::new();
    exec.to_buffer(&mut buffer).unwrap();
    assert_eq!(exec.buffer_length(), buffer.len());

    assert_eq!(exec, ExecPdu::from_buffer(buffer.as_slice()).unwrap());
}
