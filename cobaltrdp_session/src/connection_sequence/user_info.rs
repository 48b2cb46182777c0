use cobaltrdp::gcc::{
    Channel, ChannelOptions, ClientClusterData, ClientCoreData, ClientCoreOptionalData,
    ClientEarlyCapabilityFlags, ClientGccBlocks, ClientMonitorData, ClientNetworkData,
    ClientSecurityData, ColorDepth, ConnectionType, HighColorDepth, Monitor,
    MultiTransportChannelData, MultiTransportFlags, RdpVersion, RedirectionVersion,
    SecureAccessSequence, SupportedColorDepths,
};
use cobaltrdp::rdp::capability_sets::{
    Bitmap, BitmapCache, BitmapDrawingFlags, Brush, CacheDefinition, CacheEntry, FrameAcknowledge,
    General, GeneralExtraFlags, GlyphCache, GlyphSupportLevel, Input, InputFlags, LargePointer,
    LargePointerSupportFlags, MultifragmentUpdate, OffscreenBitmapCache, Order, Pointer, Sound,
    SoundFlags, SupportLevel, VirtualChannel, VirtualChannelFlags, BITMAP_CACHE_ENTRIES_NUM,
    GLYPH_CACHE_NUM,
};
use cobaltrdp::rdp::client_info::{
    AddressFamily, ClientInfo, ClientInfoFlags, CompressionType, ExtendedClientInfo,
    ExtendedClientOptionalInfo,
};
use cobaltrdp::rdp::{CapabilitySet, ClientInfoPdu, ClientConfirmActive, DemandActive};
use cobaltrdp::SecurityProtocol;
use num_traits::ToPrimitive as _;

use crate::config::SessionConfig;

const SOURCE_DESCRIPTOR: &str = "COBALTRDP";

// the default multifragment request size, and the one RemoteFX needs to fit
// its largest tile runs
const MAX_REQUEST_SIZE: u32 = 0xffff;
const REMOTE_FX_MAX_REQUEST_SIZE: u32 = 0x003e_ffff;

pub fn create_gcc_blocks(
    config: &SessionConfig,
    channel_names: &[String],
    selected_protocol: SecurityProtocol,
    multi_transport: Option<MultiTransportFlags>,
) -> ClientGccBlocks {
    ClientGccBlocks {
        core: create_core_data(config, selected_protocol),
        security: ClientSecurityData::no_security(),
        network: Some(ClientNetworkData {
            channels: channel_names
                .iter()
                .map(|name| Channel::new(name.clone(), ChannelOptions::INITIALIZED))
                .collect(),
        }),
        cluster: Some(ClientClusterData {
            redirection_version: RedirectionVersion::V4,
            redirected_session_id: 0,
        }),
        monitor: Some(ClientMonitorData {
            monitors: vec![Monitor::primary(config.desktop_width, config.desktop_height)],
        }),
        multi_transport_channel: multi_transport
            .map(|flags| MultiTransportChannelData { flags }),
    }
}

fn create_core_data(config: &SessionConfig, selected_protocol: SecurityProtocol) -> ClientCoreData {
    ClientCoreData {
        version: RdpVersion::V5_PLUS,
        desktop_width: config.desktop_width,
        desktop_height: config.desktop_height,
        color_depth: ColorDepth::Bpp4, // ignored in favor of the optional fields
        sec_access_sequence: SecureAccessSequence::Del,
        keyboard_layout: 0, // the server picks its default input locale
        client_build: config.client_build,
        client_name: config.client_name.clone(),
        keyboard_type: config.keyboard_type,
        keyboard_subtype: config.keyboard_subtype,
        keyboard_functional_keys_count: config.keyboard_functional_keys_count,
        ime_file_name: config.ime_file_name.clone(),
        optional_data: ClientCoreOptionalData {
            post_beta2_color_depth: Some(ColorDepth::Bpp4), // also ignored
            client_product_id: Some(1),
            serial_number: Some(0),
            high_color_depth: Some(HighColorDepth::Bpp24),
            supported_color_depths: Some(SupportedColorDepths::all()),
            early_capability_flags: Some(
                ClientEarlyCapabilityFlags::SUPPORT_ERR_INFO_PDU
                    | ClientEarlyCapabilityFlags::WANT_32_BPP_SESSION,
            ),
            dig_product_id: Some(config.dig_product_id.clone()),
            connection_type: Some(ConnectionType::Lan),
            server_selected_protocol: Some(selected_protocol),
        },
    }
}

pub fn create_client_info_pdu(
    config: &SessionConfig,
    client_address: &str,
    enhanced_security: bool,
) -> ClientInfoPdu {
    let mut flags = ClientInfoFlags::UNICODE
        | ClientInfoFlags::MOUSE
        | ClientInfoFlags::DISABLE_CTRL_ALT_DEL
        | ClientInfoFlags::ENABLE_WINDOWS_KEY
        | ClientInfoFlags::MAXIMIZE_SHELL
        | ClientInfoFlags::LOGON_NOTIFY
        | ClientInfoFlags::LOGON_ERRORS;
    let mut alternate_shell = String::new();
    let mut work_dir = String::new();

    if let Some(ref remote_app) = config.remote_app {
        flags |= ClientInfoFlags::RAIL;
        alternate_shell = remote_app.program.clone();
        work_dir = remote_app.working_dir.clone();
    }

    let client_info = ClientInfo {
        credentials: config.credentials.clone(),
        code_page: 0,
        flags,
        compression_type: CompressionType::K8, // ignored without the COMPRESSION flag
        alternate_shell,
        work_dir,
        extra_info: ExtendedClientInfo {
            address_family: if client_address.contains(':') {
                AddressFamily::INet6
            } else {
                AddressFamily::INet
            },
            address: client_address.to_string(),
            dir: String::new(),
            optional_data: ExtendedClientOptionalInfo::default(),
        },
    };

    ClientInfoPdu::new(client_info, enhanced_security)
}

/// Builds the canonical Confirm Active capability list. The server's sets
/// feed back into it in two places: the multifragment request size is raised
/// when RemoteFX is on the table, and frame-acknowledge is answered only if
/// the server advertised it.
pub fn create_client_confirm_active(
    config: &SessionConfig,
    server_capability_sets: &[CapabilitySet],
) -> ClientConfirmActive {
    let server_supports_remote_fx = server_capability_sets.iter().any(|set| match set {
        CapabilitySet::BitmapCodecs(codecs) => codecs.supports_remote_fx(),
        _ => false,
    });
    let server_supports_frame_acknowledge = server_capability_sets
        .iter()
        .any(|set| matches!(set, CapabilitySet::FrameAcknowledge(_)));
    let server_supports_surface_commands = server_capability_sets
        .iter()
        .any(|set| matches!(set, CapabilitySet::SurfaceCommands(_)));

    let mut capability_sets = vec![
        create_general_capability_set(),
        create_bitmap_capability_set(config),
        CapabilitySet::Order(Order::no_orders_supported()),
        CapabilitySet::BitmapCache(BitmapCache {
            caches: [CacheEntry::default(); BITMAP_CACHE_ENTRIES_NUM],
        }),
        CapabilitySet::Pointer(Pointer {
            color_pointer_cache_size: 0,
            pointer_cache_size: 0,
        }),
        create_input_capability_set(config),
        CapabilitySet::Brush(Brush {
            support_level: SupportLevel::Default,
        }),
        CapabilitySet::GlyphCache(GlyphCache {
            glyph_cache: [CacheDefinition::default(); GLYPH_CACHE_NUM],
            frag_cache: CacheDefinition::default(),
            glyph_support_level: GlyphSupportLevel::None,
        }),
        CapabilitySet::OffscreenBitmapCache(OffscreenBitmapCache {
            is_supported: false,
            cache_size: 0,
            cache_entries: 0,
        }),
        CapabilitySet::VirtualChannel(VirtualChannel {
            flags: VirtualChannelFlags::empty(),
            chunk_size: Some(0), // ignored by the server
        }),
        CapabilitySet::Sound(Sound {
            flags: SoundFlags::empty(),
        }),
        CapabilitySet::MultifragmentUpdate(MultifragmentUpdate {
            max_request_size: if server_supports_remote_fx {
                REMOTE_FX_MAX_REQUEST_SIZE
            } else {
                MAX_REQUEST_SIZE
            },
        }),
        CapabilitySet::LargePointer(LargePointer {
            flags: LargePointerSupportFlags::UP_TO_96X96_PIXELS,
        }),
    ];

    if server_supports_surface_commands {
        capability_sets.push(CapabilitySet::SurfaceCommands(
            cobaltrdp::rdp::capability_sets::SurfaceCommands {
                flags: cobaltrdp::rdp::capability_sets::CmdFlags::SET_SURFACE_BITS
                    | cobaltrdp::rdp::capability_sets::CmdFlags::STREAM_SURFACE_BITS
                    | cobaltrdp::rdp::capability_sets::CmdFlags::FRAME_MARKER,
            },
        ));
    }

    if server_supports_frame_acknowledge {
        capability_sets.push(CapabilitySet::FrameAcknowledge(FrameAcknowledge {
            max_unacknowledged_frame_count: 2,
        }));
    }

    ClientConfirmActive::new(DemandActive::new(
        SOURCE_DESCRIPTOR.to_string(),
        capability_sets,
    ))
}

fn create_general_capability_set() -> CapabilitySet {
    CapabilitySet::General(General {
        major_platform_type: cobaltrdp::rdp::capability_sets::MajorPlatformType::Unix,
        minor_platform_type: cobaltrdp::rdp::capability_sets::MinorPlatformType::Unspecified,
        extra_flags: GeneralExtraFlags::FASTPATH_OUTPUT_SUPPORTED
            | GeneralExtraFlags::NO_BITMAP_COMPRESSION_HDR
            | GeneralExtraFlags::LONG_CREDENTIALS_SUPPORTED,
        refresh_rect_support: true,
        suppress_output_support: false,
    })
}

fn create_bitmap_capability_set(config: &SessionConfig) -> CapabilitySet {
    CapabilitySet::Bitmap(Bitmap {
        pref_bits_per_pix: HighColorDepth::Bpp24.to_u16().unwrap(),
        desktop_width: config.desktop_width,
        desktop_height: config.desktop_height,
        desktop_resize_flag: true,
        drawing_flags: BitmapDrawingFlags::ALLOW_DYNAMIC_COLOR_FIDELITY
            | BitmapDrawingFlags::ALLOW_SKIP_ALPHA,
    })
}

fn create_input_capability_set(config: &SessionConfig) -> CapabilitySet {
    CapabilitySet::Input(Input {
        input_flags: InputFlags::SCANCODES | InputFlags::FASTPATH_INPUT | InputFlags::UNICODE,
        keyboard_layout: 0,
        keyboard_type: config.keyboard_type.to_u32().unwrap_or(0),
        keyboard_subtype: config.keyboard_subtype,
        keyboard_function_key: config.keyboard_functional_keys_count,
        keyboard_ime_filename: config.ime_file_name.clone(),
    })
}
