use super::*;
use crate::nego::SecurityProtocol;
use crate::PduParsing as _;

fn client_core_data() -> ClientCoreData {
    ClientCoreData {
        version: RdpVersion::V5_PLUS,
        desktop_width: 1280,
        desktop_height: 720,
        color_depth: ColorDepth::Bpp4,
        sec_access_sequence: SecureAccessSequence::Del,
        keyboard_layout: 0,
        client_build: 2600,
        client_name: String::from("cobalt-host"),
        keyboard_type: KeyboardType::IbmEnhanced,
        keyboard_subtype: 0,
        keyboard_functional_keys_count: 12,
        ime_file_name: String::new(),
        optional_data: ClientCoreOptionalData {
            post_beta2_color_depth: Some(ColorDepth::Bpp4),
            client_product_id: Some(1),
            serial_number: Some(0),
            high_color_depth: Some(HighColorDepth::Bpp24),
            supported_color_depths: Some(SupportedColorDepths::all()),
            early_capability_flags: Some(ClientEarlyCapabilityFlags::SUPPORT_ERR_INFO_PDU),
            dig_product_id: Some(String::new()),
            connection_type: Some(ConnectionType::Lan),
            server_selected_protocol: Some(SecurityProtocol::HYBRID),
        },
    }
}

fn client_gcc_blocks() -> ClientGccBlocks {
    ClientGccBlocks {
        core: client_core_data(),
        security: ClientSecurityData::no_security(),
        network: Some(ClientNetworkData {
            channels: vec![
                Channel::new(String::from("rdpsnd"), ChannelOptions::INITIALIZED),
                Channel::new(String::from("rail"), ChannelOptions::INITIALIZED),
            ],
        }),
        cluster: None,
        monitor: None,
        multi_transport_channel: None,
    }
}

fn server_gcc_blocks() -> ServerGccBlocks {
    ServerGccBlocks {
        core: ServerCoreData {
            version: RdpVersion::V10,
            optional_data: ServerCoreOptionalData {
                client_requested_protocols: Some(SecurityProtocol::HYBRID),
                early_capability_flags: Some(
                    ServerEarlyCapabilityFlags::SKIP_CHANNELJOIN_SUPPORTED,
                ),
            },
        },
        network: ServerNetworkData {
            io_channel: 1003,
            channel_ids: vec![1004, 1005],
        },
        security: ServerSecurityData {
            encryption_method: EncryptionMethod::empty(),
            encryption_level: EncryptionLevel::None,
            server_random: None,
            server_cert: Vec::new(),
        },
        message_channel: None,
        multi_transport_channel: None,
    }
}

#[test]
fn client_gcc_blocks_round_trip() {
    let blocks = client_gcc_blocks();

    let mut buffer = Vec::new();
    blocks.to_buffer(&mut buffer).unwrap();
    assert_eq!(blocks.buffer_length(), buffer.len());

    assert_eq!(blocks, ClientGccBlocks::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn client_gcc_blocks_expose_channel_names() {
    let names: Vec<_> = client_gcc_blocks()
        .channel_names()
        .into_iter()
        .map(|channel| channel.name)
        .collect();

    assert_eq!(vec![String::from("rdpsnd"), String::from("rail")], names);
}

#[test]
fn server_gcc_blocks_round_trip() {
    let blocks = server_gcc_blocks();

    let mut buffer = Vec::new();
    blocks.to_buffer(&mut buffer).unwrap();
    assert_eq!(blocks.buffer_length(), buffer.len());

    assert_eq!(blocks, ServerGccBlocks::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn server_gcc_blocks_expose_channel_ids() {
    let blocks = server_gcc_blocks();

    assert_eq!(1003, blocks.global_channel_id());
    assert_eq!(vec![1004, 1005], blocks.channel_ids());
}

#[test]
fn missing_server_core_block_is_rejected() {
    // a network block alone is not a valid server user data set
    let network = ServerNetworkData {
        io_channel: 1003,
        channel_ids: vec![],
    };
    let mut buffer = Vec::new();
    UserDataHeader::from_gcc_block(ServerGccType::NetworkData, &network)
        .unwrap()
        .to_buffer(&mut buffer)
        .unwrap();

    assert!(matches!(
        ServerGccBlocks::from_buffer(buffer.as_slice()),
        Err(GccError::RequiredServerDataBlockIsAbsent(ServerGccType::CoreData))
    ));
}

#[test]
fn conference_create_request_round_trips() {
    let request = ConferenceCreateRequest {
        gcc_blocks: client_gcc_blocks(),
    };

    let mut buffer = Vec::new();
    request.to_buffer(&mut buffer).unwrap();
    assert_eq!(request.buffer_length(), buffer.len());

    assert_eq!(
        request,
        ConferenceCreateRequest::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn conference_create_response_round_trips() {
    let response = ConferenceCreateResponse {
        user_id: 1007,
        gcc_blocks: server_gcc_blocks(),
    };

    let mut buffer = Vec::new();
    response.to_buffer(&mut buffer).unwrap();
    assert_eq!(response.buffer_length(), buffer.len());

    assert_eq!(
        response,
        ConferenceCreateResponse::from_buffer(buffer.as_slice()).unwrap()
    );
}
