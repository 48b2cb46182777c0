use super::headers::*;
use super::*;
use crate::rdp::finalization_messages::{ControlPdu, SynchronizePdu};
use crate::rdp::server_license::LicensingErrorMessage;

// security header (LICENSE_PKT) + ERROR_ALERT with STATUS_VALID_CLIENT and
// ST_NO_TRANSITION, as an xrdp-style server emits it
const LICENSE_VALID_CLIENT_BUFFER: [u8; 20] = [
    0x80, 0x00, 0x00, 0x00, // security header
    0xff, 0x02, 0x14, 0x00, // preamble
    0x07, 0x00, 0x00, 0x00, // error code
    0x02, 0x00, 0x00, 0x00, // state transition
    0x00, 0x00, 0x00, 0x00, // error info blob
];

#[test]
fn license_packet_with_valid_client_is_accepted() {
    let pdu = ServerLicensePdu::from_buffer(LICENSE_VALID_CLIENT_BUFFER.as_ref()).unwrap();

    assert!(pdu
        .security_header
        .flags
        .contains(BasicSecurityHeaderFlags::LICENSE_PKT));
    assert!(matches!(pdu.server_license, ServerLicense::ValidClient(_)));
}

#[test]
fn license_packet_without_the_license_flag_is_rejected() {
    let mut buffer = LICENSE_VALID_CLIENT_BUFFER;
    buffer[0] = 0x40; // INFO_PKT instead

    assert!(matches!(
        ServerLicensePdu::from_buffer(buffer.as_ref()),
        Err(RdpError::InvalidPdu(_))
    ));
}

#[test]
fn basic_security_header_round_trips() {
    let header = BasicSecurityHeader::new(BasicSecurityHeaderFlags::INFO_PKT);

    let mut buffer = Vec::new();
    header.to_buffer(&mut buffer).unwrap();
    assert_eq!(vec![0x40, 0x00, 0x00, 0x00], buffer);

    assert_eq!(
        header,
        BasicSecurityHeader::from_buffer(buffer.as_slice()).unwrap()
    );
}

fn data_header(share_data_pdu: ShareDataPdu) -> ShareControlHeader {
    ShareControlHeader::new(
        ShareControlPdu::Data(ShareDataHeader::new(share_data_pdu)),
        1007,
        0x0001_03ea,
    )
}

#[test]
fn synchronize_data_pdu_round_trips() {
    let header = data_header(ShareDataPdu::Synchronize(SynchronizePdu::new(1007)));

    let mut buffer = Vec::new();
    header.to_buffer(&mut buffer).unwrap();
    assert_eq!(header.buffer_length(), buffer.len());

    assert_eq!(
        header,
        ShareControlHeader::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn control_cooperate_round_trips() {
    let header = data_header(ShareDataPdu::Control(ControlPdu::new(
        ControlAction::Cooperate,
    )));

    let mut buffer = Vec::new();
    header.to_buffer(&mut buffer).unwrap();

    assert_eq!(
        header,
        ShareControlHeader::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn slow_path_update_pdu_round_trips() {
    let header = data_header(ShareDataPdu::Update(UpdatePdu {
        update_type: SlowPathUpdateType::Bitmap,
        data: vec![0xde, 0xad, 0xbe, 0xef],
    }));

    let mut buffer = Vec::new();
    header.to_buffer(&mut buffer).unwrap();

    assert_eq!(
        header,
        ShareControlHeader::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn deactivate_all_is_a_distinct_variant() {
    let header = ShareControlHeader::new(
        ShareControlPdu::ServerDeactivateAll(DeactivateAllPdu {
            source_descriptor: b"RDP\0".to_vec(),
        }),
        1002,
        0x0001_03ea,
    );

    let mut buffer = Vec::new();
    header.to_buffer(&mut buffer).unwrap();

    let parsed = ShareControlHeader::from_buffer(buffer.as_slice()).unwrap();
    assert!(matches!(
        parsed.share_control_pdu,
        ShareControlPdu::ServerDeactivateAll(_)
    ));
}

#[test]
fn share_data_header_rejects_unsupported_nested_pdus() {
    // stream id low, pduType2 = ShutdownRequest
    let buffer = [
        0x12, 0x00, 0x17, 0x10, 0xea, 0x03, 0xea, 0x03, 0x01, 0x00, // share control header
        0x00, 0x01, 0x08, 0x00, 0x24, 0x00, 0x00, 0x00, // share data header
    ];

    assert!(matches!(
        ShareControlHeader::from_buffer(buffer.as_ref()),
        Err(RdpError::UnexpectedShareDataPdu(
            ShareDataPduType::ShutdownRequest
        ))
    ));
}

#[test]
fn client_info_pdu_has_no_security_header_under_enhanced_security() {
    let client_info = crate::rdp::client_info::tests_support::minimal_client_info();

    let enhanced = ClientInfoPdu::new(client_info.clone(), true);
    assert!(enhanced.security_header.is_none());

    let basic = ClientInfoPdu::new(client_info, false);
    assert_eq!(
        Some(BasicSecurityHeader::new(BasicSecurityHeaderFlags::INFO_PKT)),
        basic.security_header
    );

    let mut enhanced_buffer = Vec::new();
    enhanced.to_buffer(&mut enhanced_buffer).unwrap();
    let mut basic_buffer = Vec::new();
    basic.to_buffer(&mut basic_buffer).unwrap();

    assert_eq!(enhanced_buffer.len() + 4, basic_buffer.len());
    assert_eq!(enhanced_buffer, basic_buffer[4..]);
}
