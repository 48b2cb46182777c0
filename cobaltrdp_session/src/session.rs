use std::collections::HashMap;
use std::io::{self, BufRead as _, Read as _, Write as _};
use std::net::TcpStream;
use std::time::Duration;

use bufstream::BufStream;
use cobaltrdp::fast_path::{is_fast_path_byte, parse_fast_path_header, write_fast_path_input};
use cobaltrdp::gcc::{MultiTransportFlags, ServerEarlyCapabilityFlags};
use cobaltrdp::rdp::capability_sets::CapabilitySet;
use cobaltrdp::rdp::headers::ShareDataPdu;
use cobaltrdp::rdp::refresh_rectangle::RefreshRectanglePdu;
use cobaltrdp::rdp::FrameAcknowledgePdu;
use cobaltrdp::SecurityProtocol;
use log::{debug, info, warn};
use native_tls::{TlsConnector, TlsStream};

use crate::active_session::{fast_path, x224, ChannelDataHandler, SessionEvent};
use crate::config::{RemoteApp, SessionConfig};
use crate::connection_sequence::{
    process_capability_sets, process_cred_ssp, process_early_user_auth_result,
    process_finalization, process_mcs, process_mcs_connect, process_negotiation,
    process_server_license_exchange, send_client_info, GLOBAL_CHANNEL_NAME, USER_CHANNEL_NAME,
};
use crate::rail::RailHandler;
use crate::transport::{
    Decoder as _, Encoder as _, SendDataContextTransport, ShareControlHeaderTransport,
    ShareDataHeaderTransport,
};
use crate::{RdpError, RdpResult};

const LICENSING_READ_TIMEOUT: Duration = Duration::from_secs(10);

const DISPLAY_CONTROL_CHANNEL_NAME: &str = "drdynvc";

/// A blocking RDP client session.
///
/// One thread drives `get_update`; writes go through `&mut self` as well, so
/// a caller that wants a separate writer thread puts the session behind its
/// own lock. Channel registrations (`enable_audio`, `set_remote_app`, …) must
/// happen before `connect`.
pub struct RdpSession {
    addr: String,
    config: SessionConfig,
    requested_channels: Vec<String>,
    audio_handler: Option<Box<dyn ChannelDataHandler>>,
    multi_transport: Option<MultiTransportFlags>,
    active: Option<ActiveSession>,
}

struct ActiveSession {
    stream: BufStream<SessionStream>,
    /// An extra handle on the socket for deadlines and shutdown; TLS sits on
    /// top of the other handle.
    tcp: TcpStream,
    fast_path_processor: fast_path::Processor,
    x224_processor: x224::Processor,
    send_data_transport: SendDataContextTransport,
    share_data_transport: ShareDataHeaderTransport,
    pending_update: Option<SessionEvent>,
    static_channels: HashMap<String, u16>,
    server_capability_sets: Vec<CapabilitySet>,
    frame_acknowledge_advertised: bool,
    ended: bool,
}

enum SessionStream {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl io::Read for SessionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SessionStream::Tcp(stream) => stream.read(buf),
            SessionStream::Tls(stream) => stream.read(buf),
        }
    }
}

impl io::Write for SessionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SessionStream::Tcp(stream) => stream.write(buf),
            SessionStream::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SessionStream::Tcp(stream) => stream.flush(),
            SessionStream::Tls(stream) => stream.flush(),
        }
    }
}

impl RdpSession {
    /// Creates a disconnected session for `addr` (`host:port`).
    pub fn new(addr: impl Into<String>, config: SessionConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
            requested_channels: Vec::new(),
            audio_handler: None,
            multi_transport: None,
            active: None,
        }
    }

    /// Registers the audio redirection channel and attaches its handler.
    pub fn enable_audio(&mut self, handler: Box<dyn ChannelDataHandler>) {
        self.register_channel(x224::AUDIO_CHANNEL_NAME);
        self.audio_handler = Some(handler);
    }

    /// Registers the dynamic virtual channel transport, over which display
    /// control (resize) runs.
    pub fn enable_display_control(&mut self) {
        self.register_channel(DISPLAY_CONTROL_CHANNEL_NAME);
    }

    /// Registers the RAIL channel and configures the RemoteApp to launch.
    pub fn set_remote_app(&mut self, remote_app: RemoteApp) {
        self.register_channel(x224::RAIL_CHANNEL_NAME);
        self.config.remote_app = Some(remote_app);
    }

    /// Advertises multitransport support in the basic settings exchange.
    pub fn enable_multitransport(&mut self, flags: MultiTransportFlags) {
        self.multi_transport = Some(flags);
    }

    fn register_channel(&mut self, name: &str) {
        if !self.requested_channels.iter().any(|channel| channel == name) {
            self.requested_channels.push(name.to_string());
        }
    }

    /// Runs the whole connection sequence. On success the session is active
    /// and `get_update` may be called.
    pub fn connect(&mut self) -> RdpResult<()> {
        if self.active.is_some() {
            return Err(RdpError::AlreadyConnected);
        }

        let tcp = TcpStream::connect(self.addr.as_str()).map_err(RdpError::ConnectionError)?;
        let control = tcp.try_clone().map_err(RdpError::ConnectionError)?;
        let client_address = tcp
            .local_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_default();

        // phase one: negotiation over the raw socket
        let mut stream = BufStream::new(tcp);
        let selected_protocol = process_negotiation(
            &mut stream,
            self.config.credentials.username.clone(),
            self.config.security_protocol,
        )?;
        info!("The server selected the {:?} protocol", selected_protocol);

        let tcp = stream
            .into_inner()
            .map_err(|e| RdpError::ConnectionError(e.into()))?;

        let enhanced_security = selected_protocol != SecurityProtocol::RDP;
        let session_stream = if selected_protocol
            .intersects(SecurityProtocol::SSL | SecurityProtocol::HYBRID | SecurityProtocol::HYBRID_EX)
        {
            let mut tls_stream = self.upgrade_to_tls(tcp)?;

            if selected_protocol
                .intersects(SecurityProtocol::HYBRID | SecurityProtocol::HYBRID_EX)
            {
                let server_public_key = peer_public_key(&tls_stream)?;
                // TSRequests are read byte-exact, so the TLS stream stays
                // unbuffered here and no read-ahead can swallow what follows
                process_cred_ssp(
                    &mut tls_stream,
                    self.config.credentials.clone(),
                    server_public_key,
                )?;

                if selected_protocol.contains(SecurityProtocol::HYBRID_EX) {
                    process_early_user_auth_result(&mut tls_stream)?;
                }
            }

            SessionStream::Tls(Box::new(tls_stream))
        } else if selected_protocol == SecurityProtocol::RDP {
            SessionStream::Tcp(tcp)
        } else {
            return Err(RdpError::UnsupportedSecurityProtocol(selected_protocol));
        };

        let mut stream = BufStream::new(session_stream);

        // phase two: basic settings exchange
        let (static_channels, early_capability_flags) = process_mcs_connect(
            &mut stream,
            &self.config,
            self.requested_channels.as_slice(),
            selected_protocol,
            self.multi_transport,
        )?;

        // phase three: channel connection
        let skip_channel_join = self.config.honor_skip_channel_join
            && early_capability_flags
                .contains(ServerEarlyCapabilityFlags::SKIP_CHANNELJOIN_SUPPORTED);
        let static_channels = process_mcs(&mut stream, static_channels, skip_channel_join)?;
        debug!("Joined static channels: {:?}", static_channels);

        let global_channel_id = *static_channels
            .get(&*GLOBAL_CHANNEL_NAME)
            .expect("the global channel is inserted during the MCS connect");
        let initiator_id = *static_channels
            .get(&*USER_CHANNEL_NAME)
            .expect("the user channel is inserted during the attach-user exchange");

        // phase four: secure settings exchange
        let mut send_data_transport = SendDataContextTransport::new(initiator_id, global_channel_id);
        send_client_info(
            &mut stream,
            &mut send_data_transport,
            &self.config,
            client_address.as_str(),
            enhanced_security,
        )?;

        // phase five: licensing, the only read with a deadline
        control
            .set_read_timeout(Some(LICENSING_READ_TIMEOUT))
            .map_err(RdpError::ConnectionError)?;
        process_server_license_exchange(&mut stream, &mut send_data_transport)?;
        control
            .set_read_timeout(None)
            .map_err(RdpError::ConnectionError)?;

        // phase six: capabilities exchange
        let mut share_control_transport = ShareControlHeaderTransport::new(
            send_data_transport,
            initiator_id,
            enhanced_security,
        );
        let (share_id, server_capability_sets) =
            process_capability_sets(&mut stream, &mut share_control_transport, &self.config)?;
        info!("Session share id: 0x{:08x}", share_id);

        // phase seven: finalization
        let mut share_data_transport = ShareDataHeaderTransport::new(share_control_transport);
        process_finalization(&mut stream, &mut share_data_transport, initiator_id)?;

        // an initial full-screen repaint is a courtesy, not a requirement
        if let Err(e) = share_data_transport.encode(
            ShareDataPdu::RefreshRectangle(RefreshRectanglePdu::full_screen(
                self.config.desktop_width,
                self.config.desktop_height,
            )),
            &mut stream,
        ) {
            warn!("Failed to request the initial full-screen refresh: {}", e);
        }

        let frame_acknowledge_advertised = server_capability_sets
            .iter()
            .any(|set| matches!(set, CapabilitySet::FrameAcknowledge(_)));

        let rail = self.config.remote_app.clone().map(|remote_app| {
            let mut handler = RailHandler::new(remote_app);
            handler.start_initialization();

            handler
        });

        let channel_names: HashMap<u16, String> = static_channels
            .iter()
            .map(|(name, id)| (*id, name.clone()))
            .collect();

        let x224_processor = x224::Processor::new(
            channel_names,
            initiator_id,
            global_channel_id,
            share_control_transport,
            rail,
            self.audio_handler.take(),
        );

        self.active = Some(ActiveSession {
            stream,
            tcp: control,
            fast_path_processor: fast_path::Processor::new(),
            x224_processor,
            send_data_transport,
            share_data_transport,
            pending_update: None,
            static_channels,
            server_capability_sets,
            frame_acknowledge_advertised,
            ended: false,
        });

        Ok(())
    }

    /// Blocks until the next normalized update frame or the end of the
    /// session. The slow path may take several records to produce one frame;
    /// everything consumed in between (RAIL, audio, error info) is handled
    /// internally.
    pub fn get_update(&mut self) -> RdpResult<SessionEvent> {
        let active = self.active.as_mut().ok_or(RdpError::NotConnected)?;

        if active.ended {
            return Ok(SessionEvent::SessionEnded);
        }

        loop {
            if let Some(event) = active.pending_update.take() {
                if event == SessionEvent::SessionEnded {
                    active.ended = true;
                }

                return Ok(event);
            }

            // the first byte decides the lane: 0x03 is a TPKT record, low
            // bits 00 a FastPath one
            let first_byte = peek_first_byte(&mut active.stream)?;

            if is_fast_path_byte(first_byte) {
                let (header, _total_length) = parse_fast_path_header(&mut active.stream)?;

                let mut payload = vec![0; usize::from(header.data_length)];
                active.stream.read_exact(payload.as_mut())?;

                let frame = active
                    .fast_path_processor
                    .process(&header, payload.as_slice())?;
                active.pending_update = Some(SessionEvent::Update(frame));
            } else {
                let (channel_ids, pdu) =
                    active.send_data_transport.decode(&mut active.stream)?;

                active.pending_update = active.x224_processor.process(
                    &mut active.stream,
                    channel_ids,
                    pdu.as_slice(),
                )?;
            }
        }
    }

    /// Sends one already-formatted FastPath input event record.
    pub fn send_input_event(&mut self, event: &[u8]) -> RdpResult<()> {
        let active = self.active.as_mut().ok_or(RdpError::NotConnected)?;

        write_fast_path_input(&mut active.stream, 1, event)?;
        active.stream.flush()?;

        Ok(())
    }

    /// Acknowledges a surface-command frame. A no-op unless the server
    /// advertised the frame-acknowledge capability.
    pub fn send_frame_acknowledge(&mut self, frame_id: u32) -> RdpResult<()> {
        let active = self.active.as_mut().ok_or(RdpError::NotConnected)?;

        if !active.frame_acknowledge_advertised {
            debug!("Skipping frame acknowledge: the server did not advertise the capability");

            return Ok(());
        }

        let mut transport = active.share_data_transport;
        transport.encode(
            ShareDataPdu::FrameAcknowledge(FrameAcknowledgePdu { frame_id }),
            &mut active.stream,
        )
    }

    /// The server capability sets recorded during the capabilities exchange.
    pub fn server_capability_sets(&self) -> Option<&[CapabilitySet]> {
        self.active
            .as_ref()
            .map(|active| active.server_capability_sets.as_slice())
    }

    /// The frozen channel-name-to-channel-ID map.
    pub fn static_channels(&self) -> Option<&HashMap<String, u16>> {
        self.active.as_ref().map(|active| &active.static_channels)
    }

    /// Tears the TCP stream down. Any blocked read returns an error and the
    /// session is gone; there is no graceful half-close in RDP.
    pub fn close(&mut self) -> RdpResult<()> {
        if let Some(active) = self.active.take() {
            active
                .tcp
                .shutdown(std::net::Shutdown::Both)
                .map_err(RdpError::ConnectionError)?;
        }

        Ok(())
    }

    fn upgrade_to_tls(&self, tcp: TcpStream) -> RdpResult<TlsStream<TcpStream>> {
        // RDP certificates are routinely self-signed; the CredSSP public-key
        // binding is what actually ties the channel to the server
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(RdpError::TlsConnectorError)?;

        let host = self.addr.split(':').next().unwrap_or(self.addr.as_str());

        connector.connect(host, tcp).map_err(|e| match e {
            native_tls::HandshakeError::Failure(e) => RdpError::TlsHandshakeError(e),
            native_tls::HandshakeError::WouldBlock(_) => RdpError::IOError(io::Error::new(
                io::ErrorKind::WouldBlock,
                "TLS handshake interrupted on a blocking socket",
            )),
        })
    }
}

fn peek_first_byte(stream: &mut impl io::BufRead) -> RdpResult<u8> {
    let buffer = stream.fill_buf()?;

    buffer.first().copied().ok_or_else(|| {
        RdpError::IOError(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "the stream is closed",
        ))
    })
}

fn peer_public_key(tls_stream: &TlsStream<TcpStream>) -> RdpResult<Vec<u8>> {
    let certificate = tls_stream
        .peer_certificate()
        .map_err(RdpError::TlsConnectorError)?
        .ok_or(RdpError::MissingPeerCertificate)?;
    let certificate_der = certificate
        .to_der()
        .map_err(RdpError::TlsConnectorError)?;

    let (_, certificate) = x509_parser::parse_x509_certificate(certificate_der.as_slice())
        .map_err(|e| RdpError::InvalidPeerCertificate(e.to_string()))?;

    // the CredSSP binding covers the whole SubjectPublicKeyInfo DER
    Ok(certificate.public_key().raw.to_vec())
}
