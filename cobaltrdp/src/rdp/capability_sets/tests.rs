use super::*;

fn client_capability_sets() -> Vec<CapabilitySet> {
    vec![
        CapabilitySet::General(General {
            major_platform_type: MajorPlatformType::Unix,
            minor_platform_type: MinorPlatformType::Unspecified,
            extra_flags: GeneralExtraFlags::FASTPATH_OUTPUT_SUPPORTED,
            refresh_rect_support: true,
            suppress_output_support: false,
        }),
        CapabilitySet::Bitmap(Bitmap {
            pref_bits_per_pix: 32,
            desktop_width: 1280,
            desktop_height: 720,
            desktop_resize_flag: false,
            drawing_flags: BitmapDrawingFlags::empty(),
        }),
        CapabilitySet::Order(Order::no_orders_supported()),
        CapabilitySet::Pointer(Pointer {
            color_pointer_cache_size: 0,
            pointer_cache_size: 0,
        }),
        CapabilitySet::Sound(Sound {
            flags: SoundFlags::empty(),
        }),
        CapabilitySet::MultifragmentUpdate(MultifragmentUpdate {
            max_request_size: 0xffff,
        }),
        CapabilitySet::LargePointer(LargePointer {
            flags: LargePointerSupportFlags::UP_TO_96X96_PIXELS,
        }),
        CapabilitySet::FrameAcknowledge(FrameAcknowledge {
            max_unacknowledged_frame_count: 2,
        }),
    ]
}

#[test]
fn demand_active_round_trips() {
    let pdu = DemandActive::new(String::from("RDP"), client_capability_sets());

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();
    assert_eq!(pdu.buffer_length(), buffer.len());

    assert_eq!(pdu, DemandActive::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn client_confirm_active_carries_the_server_channel_originator() {
    let pdu = ClientConfirmActive::new(DemandActive::new(
        String::from("RDP"),
        client_capability_sets(),
    ));

    let mut buffer = Vec::new();
    pdu.to_buffer(&mut buffer).unwrap();

    assert_eq!([0xea, 0x03], buffer[0..2]);
    assert_eq!(
        pdu,
        ClientConfirmActive::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn server_demand_active_tolerates_a_missing_session_id() {
    let inner = DemandActive::new(String::from("RDP"), client_capability_sets());
    let mut buffer = Vec::new();
    inner.to_buffer(&mut buffer).unwrap();

    let parsed = ServerDemandActive::from_buffer(buffer.as_slice()).unwrap();
    assert_eq!(inner, parsed.pdu);
}

#[test]
fn opaque_capability_set_preserves_its_bytes() {
    let set = CapabilitySet::Share(vec![0x12, 0x34, 0x56, 0x78]);

    let mut buffer = Vec::new();
    set.to_buffer(&mut buffer).unwrap();
    assert_eq!(set.buffer_length(), buffer.len());

    assert_eq!(set, CapabilitySet::from_buffer(buffer.as_slice()).unwrap());
}

#[test]
fn capability_set_with_trailing_padding_parses() {
    // a Sound set padded to twice its nominal length
    let buffer = [
        0x0c, 0x00, 0x0c, 0x00, // type, length
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    let set = CapabilitySet::from_buffer(buffer.as_ref()).unwrap();
    assert_eq!(
        CapabilitySet::Sound(Sound {
            flags: SoundFlags::BEEPS
        }),
        set
    );
}

#[test]
fn unknown_capability_set_type_is_rejected() {
    let buffer = [0xf0, 0x00, 0x04, 0x00];

    assert!(matches!(
        CapabilitySet::from_buffer(buffer.as_ref()),
        Err(CapabilitySetsError::InvalidType)
    ));
}

#[test]
fn guid_uses_the_microsoft_wire_layout() {
    let mut buffer = Vec::new();
    CODEC_GUID_REMOTEFX.to_buffer(&mut buffer).unwrap();

    assert_eq!(
        vec![
            0x12, 0x2f, 0x77, 0x76, // Data1, little-endian
            0x72, 0xbd, // Data2, little-endian
            0x63, 0x44, // Data3, little-endian
            0xaf, 0xb3, 0xb7, 0x3c, 0x9c, 0x6f, 0x78, 0x86, // Data4, as-is
        ],
        buffer
    );

    assert_eq!(
        CODEC_GUID_REMOTEFX,
        Guid::from_buffer(buffer.as_slice()).unwrap()
    );
}

#[test]
fn bitmap_codecs_detect_remote_fx() {
    let codecs = BitmapCodecs(vec![Codec {
        guid: CODEC_GUID_REMOTEFX,
        id: 3,
        properties: vec![0x00; 4],
    }]);

    let mut buffer = Vec::new();
    codecs.to_buffer(&mut buffer).unwrap();
    assert_eq!(codecs.buffer_length(), buffer.len());

    let parsed = BitmapCodecs::from_buffer(buffer.as_slice()).unwrap();
    assert!(parsed.supports_remote_fx());
    assert!(!parsed.supports_ns_codec());
}
