mod user_info;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::io;

use cobaltrdp::credssp::{CredSspClient, CredSspResult, EarlyUserAuthResult};
use cobaltrdp::credssp::ts_request::TsRequest;
use cobaltrdp::gcc::ServerEarlyCapabilityFlags;
use cobaltrdp::mcs::{ChannelJoinRequestPdu, ErectDomainPdu};
use cobaltrdp::rdp::headers::{ShareControlPdu, ShareDataPdu};
use cobaltrdp::rdp::finalization_messages::{ControlPdu, FontPdu, SynchronizePdu};
use cobaltrdp::rdp::{CapabilitySet, ClientInfoPdu, ServerLicensePdu};
use cobaltrdp::{nego, ConnectInitial, ConnectResponse, McsPdu, PduParsing, SecurityProtocol};
use lazy_static::lazy_static;
use log::{debug, warn};

use crate::config::SessionConfig;
use crate::transport::{
    Decoder, Encoder, McsTransport, SendDataContextTransport, ShareControlHeaderTransport,
    ShareDataHeaderTransport, TsRequestTransport,
};
use crate::{RdpError, RdpResult};

pub type StaticChannels = HashMap<String, u16>;

lazy_static! {
    pub static ref GLOBAL_CHANNEL_NAME: String = String::from("global");
    pub static ref USER_CHANNEL_NAME: String = String::from("user");
}

/// Phase one: X.224 negotiation. The failure codes a server may answer with
/// are actionable, so they surface verbatim.
pub fn process_negotiation<S>(
    mut stream: &mut S,
    cookie: String,
    request_protocols: SecurityProtocol,
) -> RdpResult<SecurityProtocol>
where
    S: io::Read + io::Write,
{
    let connection_request = nego::Request {
        nego_data: Some(nego::NegoData::Cookie(cookie)),
        flags: nego::RequestFlags::empty(),
        protocol: request_protocols,
        src_ref: 0,
    };
    debug!("Send X.224 Connection Request PDU: {:?}", connection_request);
    connection_request.to_buffer(&mut stream)?;
    stream.flush()?;

    let connection_confirm = nego::Response::from_buffer(&mut stream)?;
    debug!("Got X.224 Connection Confirm PDU: {:?}", connection_confirm);

    match connection_confirm.response {
        Some(nego::ResponseData::Response { protocol, .. }) => {
            if request_protocols.contains(protocol) {
                Ok(protocol)
            } else {
                Err(RdpError::InvalidResponse(format!(
                    "got unexpected security protocol: {:?} while one of {:?} was expected",
                    protocol, request_protocols
                )))
            }
        }
        _ => Err(RdpError::InvalidResponse(String::from(
            "the connection confirm carries no negotiation response",
        ))),
    }
}

/// The NLA handshake over the fresh TLS stream: CredSSP/NTLM legs, the
/// public-key binding, and the sealed credentials.
pub fn process_cred_ssp<S>(
    mut tls_stream: &mut S,
    credentials: cobaltrdp::Credentials,
    server_public_key: Vec<u8>,
) -> RdpResult<()>
where
    S: io::Read + io::Write,
{
    let mut transport = TsRequestTransport::default();

    let mut cred_ssp_client = CredSspClient::new(server_public_key, credentials);
    let mut next_ts_request = TsRequest::default();

    loop {
        let result = cred_ssp_client.process(next_ts_request)?;

        match result {
            CredSspResult::ReplyNeeded(ts_request) => {
                debug!("Send CredSSP TSRequest: {:x?}", ts_request);
                transport.encode(ts_request, &mut tls_stream)?;

                next_ts_request = transport.decode(&mut tls_stream)?;
                debug!("Got CredSSP TSRequest: {:x?}", next_ts_request);
            }
            CredSspResult::FinalMessage(ts_request) => {
                debug!("Send CredSSP TSRequest: {:x?}", ts_request);
                transport.encode(ts_request, &mut tls_stream)?;

                break;
            }
            CredSspResult::Finished => break,
        }
    }

    Ok(())
}

/// The Early User Authorization Result gate of HYBRID_EX.
pub fn process_early_user_auth_result<S>(mut stream: &mut S) -> RdpResult<()>
where
    S: io::Read,
{
    let mut buffer = [0x00; cobaltrdp::credssp::EARLY_USER_AUTH_RESULT_PDU_SIZE];
    stream
        .read_exact(&mut buffer)
        .map_err(RdpError::EarlyUserAuthResultError)?;

    match EarlyUserAuthResult::from_buffer(buffer.as_ref())
        .map_err(RdpError::EarlyUserAuthResultError)?
    {
        EarlyUserAuthResult::Success => Ok(()),
        EarlyUserAuthResult::AccessDenied => Err(RdpError::AccessDenied),
    }
}

/// Phase two: MCS connect with the client GCC blocks; records the server's
/// channel-ID assignment and its early-capability flags.
pub fn process_mcs_connect<S>(
    mut stream: &mut S,
    config: &SessionConfig,
    channel_names: &[String],
    selected_protocol: SecurityProtocol,
    multi_transport: Option<cobaltrdp::gcc::MultiTransportFlags>,
) -> RdpResult<(StaticChannels, ServerEarlyCapabilityFlags)>
where
    S: io::Read + io::Write,
{
    let connect_initial = ConnectInitial::with_gcc_blocks(user_info::create_gcc_blocks(
        config,
        channel_names,
        selected_protocol,
        multi_transport,
    ));
    debug!("Send MCS Connect Initial PDU: {:?}", connect_initial);

    let mut connect_initial_buffer = bytes::BytesMut::with_capacity(connect_initial.buffer_length());
    connect_initial_buffer.resize(connect_initial.buffer_length(), 0x00);
    connect_initial
        .to_buffer(connect_initial_buffer.as_mut())
        .map_err(RdpError::McsConnectError)?;
    crate::transport::DataTransport.encode(connect_initial_buffer, &mut stream)?;

    let data = crate::transport::DataTransport.decode(&mut stream)?;
    let connect_response =
        ConnectResponse::from_buffer(data.as_ref()).map_err(RdpError::McsConnectError)?;
    debug!("Got MCS Connect Response PDU: {:?}", connect_response);

    let gcc_blocks = &connect_response.conference_create_response.gcc_blocks;

    let early_capability_flags = gcc_blocks.core.early_capability_flags();

    let channel_ids = connect_response.channel_ids();
    if channel_ids.len() < channel_names.len() {
        return Err(RdpError::InvalidResponse(format!(
            "the server assigned {} channel ids for {} requested channels",
            channel_ids.len(),
            channel_names.len()
        )));
    }

    let mut static_channels: StaticChannels = channel_names
        .iter()
        .cloned()
        .zip(channel_ids.into_iter())
        .collect();
    static_channels.insert(
        GLOBAL_CHANNEL_NAME.clone(),
        connect_response.global_channel_id(),
    );

    Ok((static_channels, early_capability_flags))
}

/// Phase three: erect-domain, attach-user, then one channel join round trip
/// per channel, unless both sides agreed to skip the joins.
pub fn process_mcs<S>(
    mut stream: &mut S,
    mut static_channels: StaticChannels,
    skip_channel_join: bool,
) -> RdpResult<StaticChannels>
where
    S: io::Read + io::Write,
{
    let mut transport = McsTransport::default();

    let erect_domain_request = McsPdu::ErectDomainRequest(ErectDomainPdu {
        sub_height: 0,
        sub_interval: 0,
    });
    debug!("Send MCS Erect Domain Request PDU: {:?}", erect_domain_request);
    transport.encode(erect_domain_request, &mut stream)?;

    debug!("Send MCS Attach User Request PDU");
    transport.encode(McsPdu::AttachUserRequest, &mut stream)?;

    let mcs_pdu = transport.decode(&mut stream)?;
    let initiator_id = if let McsPdu::AttachUserConfirm(attach_user_confirm) = mcs_pdu {
        debug!("Got MCS Attach User Confirm PDU: {:?}", attach_user_confirm);

        attach_user_confirm.initiator_id
    } else {
        return Err(RdpError::UnexpectedPdu(format!(
            "expected Attach User Confirm, got {}",
            mcs_pdu.as_short_name()
        )));
    };

    static_channels.insert(USER_CHANNEL_NAME.clone(), initiator_id);

    if skip_channel_join {
        debug!("Skipping channel joins per server early capability flags");

        return Ok(static_channels);
    }

    for (name, channel_id) in static_channels.iter() {
        let channel_join_request = McsPdu::ChannelJoinRequest(ChannelJoinRequestPdu {
            initiator_id,
            channel_id: *channel_id,
        });
        debug!(
            "Send MCS Channel Join Request PDU for \"{}\": {:?}",
            name, channel_join_request
        );
        transport.encode(channel_join_request, &mut stream)?;

        let mcs_pdu = transport.decode(&mut stream)?;
        if let McsPdu::ChannelJoinConfirm(channel_join_confirm) = mcs_pdu {
            debug!("Got MCS Channel Join Confirm PDU: {:?}", channel_join_confirm);

            if channel_join_confirm.initiator_id != initiator_id
                || channel_join_confirm.requested_channel_id != *channel_id
            {
                return Err(RdpError::InvalidResponse(String::from(
                    "the channel join confirm does not match the requested channel",
                )));
            }
        } else {
            return Err(RdpError::UnexpectedPdu(format!(
                "expected Channel Join Confirm, got {}",
                mcs_pdu.as_short_name()
            )));
        }
    }

    Ok(static_channels)
}

/// Phase four: the Client Info PDU on the global channel, with or without the
/// basic security header depending on the negotiated security.
pub fn send_client_info<S>(
    mut stream: &mut S,
    transport: &mut SendDataContextTransport,
    config: &SessionConfig,
    client_address: &str,
    enhanced_security: bool,
) -> RdpResult<()>
where
    S: io::Read + io::Write,
{
    let client_info_pdu: ClientInfoPdu =
        user_info::create_client_info_pdu(config, client_address, enhanced_security);
    debug!("Send Client Info PDU: {:?}", client_info_pdu);

    let mut pdu = Vec::with_capacity(client_info_pdu.buffer_length());
    client_info_pdu
        .to_buffer(&mut pdu)
        .map_err(RdpError::ClientInfoError)?;
    transport.encode(pdu, &mut stream)
}

/// Phase five: the license packet. The caller puts a read deadline around
/// this; an elapsed deadline is rewritten into a credentials/XRDP hint.
pub fn process_server_license_exchange<S>(
    mut stream: &mut S,
    transport: &mut SendDataContextTransport,
) -> RdpResult<()>
where
    S: io::Read + io::Write,
{
    let (channel_ids, pdu) = match transport.decode(&mut stream) {
        Ok(decoded) => decoded,
        Err(ref e) if is_read_timeout(e) => return Err(RdpError::LicensingTimeout),
        Err(e) => return Err(e),
    };
    debug!("Got Server License PDU on channel {}", channel_ids.channel_id);

    let server_license = ServerLicensePdu::from_buffer(pdu.as_slice())
        .map_err(RdpError::ServerLicenseError)?;
    debug!("Server License: {:?}", server_license.server_license);

    Ok(())
}

fn is_read_timeout(error: &RdpError) -> bool {
    let io_error = match error {
        RdpError::IOError(e) => e,
        RdpError::NegotiationError(nego::NegotiationError::IOError(e)) => e,
        _ => return false,
    };

    matches!(
        io_error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Phase six: Demand Active in, Confirm Active out. Returns the share id and
/// the server capability sets, which stay read-only from here on.
pub fn process_capability_sets<S>(
    mut stream: &mut S,
    transport: &mut ShareControlHeaderTransport,
    config: &SessionConfig,
) -> RdpResult<(u32, Vec<CapabilitySet>)>
where
    S: io::Read + io::Write,
{
    let share_control_header = transport.decode(&mut stream)?;
    let server_capability_sets =
        if let ShareControlPdu::ServerDemandActive(server_demand_active) =
            share_control_header.share_control_pdu
        {
            debug!("Got Server Demand Active PDU: {:?}", server_demand_active.pdu);

            server_demand_active.pdu.capability_sets
        } else {
            return Err(RdpError::UnexpectedPdu(format!(
                "expected Server Demand Active, got {}",
                share_control_header.share_control_pdu.as_short_name()
            )));
        };

    let share_id = share_control_header.share_id;
    transport.set_share_id(share_id);

    let client_confirm_active =
        user_info::create_client_confirm_active(config, &server_capability_sets);
    debug!("Send Client Confirm Active PDU: {:?}", client_confirm_active.pdu);
    transport.encode(
        ShareControlPdu::ClientConfirmActive(client_confirm_active),
        &mut stream,
    )?;

    Ok((share_id, server_capability_sets))
}

/// Phase seven: the synchronize/control/font dance, after which the session
/// is active. Server-side error info PDUs in between are logged and skipped.
pub fn process_finalization<S>(
    mut stream: &mut S,
    transport: &mut ShareDataHeaderTransport,
    initiator_id: u16,
) -> RdpResult<()>
where
    S: io::Read + io::Write,
{
    #[derive(Copy, Clone, Debug, PartialEq)]
    enum FinalizationOrder {
        Synchronize,
        ControlCooperate,
        ControlGrantedControl,
        FontMap,
        Finished,
    }

    let mut finalization_order = FinalizationOrder::Synchronize;

    let synchronize = ShareDataPdu::Synchronize(SynchronizePdu::new(initiator_id));
    debug!("Send Synchronize PDU: {:?}", synchronize);
    transport.encode(synchronize, &mut stream)?;

    let cooperate = ShareDataPdu::Control(ControlPdu::new(
        cobaltrdp::ControlAction::Cooperate,
    ));
    debug!("Send Control (Cooperate) PDU: {:?}", cooperate);
    transport.encode(cooperate, &mut stream)?;

    let request_control = ShareDataPdu::Control(ControlPdu::new(
        cobaltrdp::ControlAction::RequestControl,
    ));
    debug!("Send Control (Request Control) PDU: {:?}", request_control);
    transport.encode(request_control, &mut stream)?;

    let font_list = ShareDataPdu::FontList(FontPdu::default());
    debug!("Send Font List PDU: {:?}", font_list);
    transport.encode(font_list, &mut stream)?;

    while finalization_order != FinalizationOrder::Finished {
        let share_data_pdu = transport.decode(&mut stream)?;
        debug!("Got Finalization PDU: {:?}", share_data_pdu);

        finalization_order = match (finalization_order, share_data_pdu) {
            (FinalizationOrder::Synchronize, ShareDataPdu::Synchronize(_)) => {
                FinalizationOrder::ControlCooperate
            }
            (
                FinalizationOrder::ControlCooperate,
                ShareDataPdu::Control(ControlPdu {
                    action: cobaltrdp::ControlAction::Cooperate,
                    ..
                }),
            ) => FinalizationOrder::ControlGrantedControl,
            (
                FinalizationOrder::ControlGrantedControl,
                ShareDataPdu::Control(ControlPdu {
                    action: cobaltrdp::ControlAction::GrantedControl,
                    ..
                }),
            ) => FinalizationOrder::FontMap,
            (FinalizationOrder::FontMap, ShareDataPdu::FontMap(_)) => FinalizationOrder::Finished,
            (order, ShareDataPdu::SetErrorInfo(error_info)) => {
                warn!(
                    "Got Server Set Error Info PDU during finalization: {}",
                    error_info.description()
                );

                order
            }
            (order, pdu) => {
                return Err(RdpError::UnexpectedPdu(format!(
                    "unexpected finalization PDU in state {:?}: {}",
                    order,
                    pdu.as_short_name()
                )))
            }
        };
    }

    Ok(())
}
