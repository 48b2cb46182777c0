#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::io;

use byteorder::{LittleEndian, WriteBytesExt};
use cobaltrdp::rdp::headers::{ShareControlPdu, ShareDataPdu};
use log::{debug, warn};
use num_traits::ToPrimitive as _;

use super::{ChannelDataHandler, SessionEvent, UpdateFrame};
use crate::rail::RailHandler;
use crate::transport::{
    ChannelIdentificators, Encoder, ShareControlHeaderTransport, StaticVirtualChannelTransport,
};
use crate::{RdpError, RdpResult};

pub const RAIL_CHANNEL_NAME: &str = "rail";
pub const AUDIO_CHANNEL_NAME: &str = "rdpsnd";

/// Demultiplexes slow-path records: RAIL and audio traffic go to their
/// handlers, the global channel is parsed as share-control, and everything
/// that does not produce an update frame is consumed here.
pub struct Processor {
    channel_names: HashMap<u16, String>,
    initiator_id: u16,
    global_channel_id: u16,
    share_control_transport: ShareControlHeaderTransport,
    rail: Option<RailHandler>,
    audio: Option<Box<dyn ChannelDataHandler>>,
}

impl Processor {
    pub fn new(
        channel_names: HashMap<u16, String>,
        initiator_id: u16,
        global_channel_id: u16,
        share_control_transport: ShareControlHeaderTransport,
        rail: Option<RailHandler>,
        audio: Option<Box<dyn ChannelDataHandler>>,
    ) -> Self {
        Self {
            channel_names,
            initiator_id,
            global_channel_id,
            share_control_transport,
            rail,
            audio,
        }
    }

    /// Handles one demultiplexed slow-path record. `Some` carries an event
    /// for the caller; `None` means the record was consumed internally and
    /// the read loop should continue.
    pub fn process(
        &mut self,
        mut stream: impl io::Read + io::Write,
        channel_ids: ChannelIdentificators,
        pdu: &[u8],
    ) -> RdpResult<Option<SessionEvent>> {
        if channel_ids.channel_id == self.global_channel_id {
            return self.process_global_channel(pdu);
        }

        match self
            .channel_names
            .get(&channel_ids.channel_id)
            .map(String::as_str)
        {
            Some(RAIL_CHANNEL_NAME) => {
                self.process_rail_data(&mut stream, channel_ids, pdu)?;

                Ok(None)
            }
            Some(AUDIO_CHANNEL_NAME) => {
                self.process_audio_data(&mut stream, channel_ids, pdu)?;

                Ok(None)
            }
            Some(name) => {
                debug!("Ignoring data on unhandled channel \"{}\"", name);

                Ok(None)
            }
            None => Err(RdpError::UnexpectedChannel(channel_ids.channel_id)),
        }
    }

    fn process_global_channel(&mut self, pdu: &[u8]) -> RdpResult<Option<SessionEvent>> {
        let share_control_header = self.share_control_transport.decode_from_pdu(pdu)?;

        match share_control_header.share_control_pdu {
            ShareControlPdu::ServerDeactivateAll(_) => {
                debug!("Got Server Deactivate All PDU; the session ends");

                Ok(Some(SessionEvent::SessionEnded))
            }
            ShareControlPdu::Data(share_data_header) => {
                match share_data_header.share_data_pdu {
                    ShareDataPdu::Update(update) => {
                        Ok(Some(SessionEvent::Update(normalize_slow_path_update(update)?)))
                    }
                    ShareDataPdu::SetErrorInfo(error_info) => {
                        warn!(
                            "Got Server Set Error Info PDU: 0x{:08x} ({})",
                            error_info.error_info,
                            error_info.description()
                        );

                        Ok(None)
                    }
                    pdu => {
                        debug!("Ignoring {} on the global channel", pdu.as_short_name());

                        Ok(None)
                    }
                }
            }
            pdu => {
                debug!("Ignoring {} on the global channel", pdu.as_short_name());

                Ok(None)
            }
        }
    }

    fn process_rail_data(
        &mut self,
        mut stream: impl io::Read + io::Write,
        channel_ids: ChannelIdentificators,
        pdu: &[u8],
    ) -> RdpResult<()> {
        let rail = match self.rail {
            Some(ref mut rail) => rail,
            // without a RemoteApp there is nothing to drive; the channel
            // stays healthy by consuming its data
            None => {
                debug!("Ignoring RAIL data: no RemoteApp is configured");

                return Ok(());
            }
        };

        let (_header, payload) = crate::transport::strip_channel_header(pdu)?;
        let replies = rail.process(payload.as_slice())?;

        let mut transport =
            StaticVirtualChannelTransport::new(self.initiator_id, channel_ids.channel_id);
        for reply in replies {
            transport.encode(reply, &mut stream)?;
        }

        Ok(())
    }

    fn process_audio_data(
        &mut self,
        mut stream: impl io::Read + io::Write,
        channel_ids: ChannelIdentificators,
        pdu: &[u8],
    ) -> RdpResult<()> {
        let audio = match self.audio {
            Some(ref mut audio) => audio,
            None => {
                debug!("Ignoring audio data: no audio handler is attached");

                return Ok(());
            }
        };

        let (_header, payload) = crate::transport::strip_channel_header(pdu)?;

        if let Some(reply) = audio.process_complete_data(payload)? {
            let mut transport =
                StaticVirtualChannelTransport::new(self.initiator_id, channel_ids.channel_id);
            transport.encode(reply, &mut stream)?;
        }

        Ok(())
    }
}

/// Rebuilds a slow-path update in the FastPath frame layout: the matching
/// FastPath code in the header byte, the overflow-checked size, then the
/// update-type word and payload exactly as they came.
fn normalize_slow_path_update(
    update: cobaltrdp::rdp::headers::UpdatePdu,
) -> RdpResult<UpdateFrame> {
    use cobaltrdp::fast_path::UpdateCode;
    use cobaltrdp::rdp::headers::SlowPathUpdateType;

    let update_code = match update.update_type {
        SlowPathUpdateType::Orders => UpdateCode::Orders,
        SlowPathUpdateType::Bitmap => UpdateCode::Bitmap,
        SlowPathUpdateType::Palette => UpdateCode::Palette,
        SlowPathUpdateType::Synchronize => UpdateCode::Synchronize,
    };

    let size = u16::try_from(update.data.len())
        .ok()
        .and_then(|size| size.checked_add(2))
        .ok_or(cobaltrdp::fast_path::FastPathError::SizeOverflow)?;

    let mut data = Vec::with_capacity(3 + usize::from(size));
    data.push(update_code.to_u8().unwrap());
    data.write_u16::<LittleEndian>(size)?;
    data.write_u16::<LittleEndian>(update.update_type.to_u16().unwrap())?;
    data.extend_from_slice(update.data.as_ref());

    Ok(UpdateFrame { update_code, data })
}
