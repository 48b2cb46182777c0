use cobaltrdp::gcc::KeyboardType;
use cobaltrdp::{Credentials, SecurityProtocol};

const DEFAULT_WIDTH: u16 = 1280;
const DEFAULT_HEIGHT: u16 = 720;

/// Everything the session needs to know before it dials: identity, desktop
/// geometry and the protocol wishes. Channel registrations are added through
/// the `RdpSession::enable_*` methods before `connect`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credentials: Credentials,
    pub security_protocol: SecurityProtocol,
    pub desktop_width: u16,
    pub desktop_height: u16,
    pub client_name: String,
    pub client_build: u32,
    pub keyboard_type: KeyboardType,
    pub keyboard_subtype: u32,
    pub keyboard_functional_keys_count: u32,
    pub ime_file_name: String,
    pub dig_product_id: String,
    /// Joining every channel is the compatible default; honoring the
    /// server's skip-channel-join hint saves round trips on servers that
    /// really support it.
    pub honor_skip_channel_join: bool,
    pub remote_app: Option<RemoteApp>,
}

impl SessionConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            security_protocol: SecurityProtocol::HYBRID | SecurityProtocol::SSL,
            desktop_width: DEFAULT_WIDTH,
            desktop_height: DEFAULT_HEIGHT,
            client_name: whoami::fallible::hostname().unwrap_or_else(|_| String::from("cobaltrdp")),
            client_build: 0,
            keyboard_type: KeyboardType::IbmEnhanced,
            keyboard_subtype: 0,
            keyboard_functional_keys_count: 12,
            ime_file_name: String::new(),
            dig_product_id: String::new(),
            honor_skip_channel_join: false,
            remote_app: None,
        }
    }

    pub fn with_desktop_size(mut self, width: u16, height: u16) -> Self {
        self.desktop_width = width;
        self.desktop_height = height;
        self
    }
}

/// The program a RemoteApp session launches through the RAIL channel.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteApp {
    pub program: String,
    pub working_dir: String,
    pub args: String,
}
