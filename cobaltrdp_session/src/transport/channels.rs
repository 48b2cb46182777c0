use std::io;

use cobaltrdp::rdp::vc;
use cobaltrdp::PduParsing;

use super::{Decoder, Encoder, SendDataContextTransport};
use crate::{RdpError, RdpResult};

/// Who sent a PDU and on which channel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChannelIdentificators {
    pub initiator_id: u16,
    pub channel_id: u16,
}

/// Static virtual channel traffic (RAIL, audio): a channel PDU header around
/// the payload, carried in a Send-Data PDU addressed to the channel.
#[derive(Copy, Clone, Debug)]
pub struct StaticVirtualChannelTransport {
    send_data_transport: SendDataContextTransport,
}

impl StaticVirtualChannelTransport {
    pub fn new(initiator_id: u16, channel_id: u16) -> Self {
        Self {
            send_data_transport: SendDataContextTransport::new(initiator_id, channel_id),
        }
    }
}

impl Encoder for StaticVirtualChannelTransport {
    type Item = Vec<u8>;
    type Error = RdpError;

    fn encode(&mut self, mut channel_data: Self::Item, mut stream: impl io::Write) -> RdpResult<()> {
        let channel_header = vc::ChannelPduHeader::whole(channel_data.len() as u32);

        let mut channel_buffer =
            Vec::with_capacity(channel_header.buffer_length() + channel_data.len());
        channel_header.to_buffer(&mut channel_buffer)?;
        channel_buffer.append(&mut channel_data);

        self.send_data_transport.encode(channel_buffer, &mut stream)
    }
}

/// Strips the channel PDU header off an already-demultiplexed channel chunk.
/// This client does not reassemble fragmented channel data; chunks without
/// FIRST|LAST are handed through as they come.
pub fn strip_channel_header(channel_data: &[u8]) -> RdpResult<(vc::ChannelPduHeader, Vec<u8>)> {
    let mut stream = channel_data;
    let header = vc::ChannelPduHeader::from_buffer(&mut stream)?;

    Ok((header, stream.to_vec()))
}

#[cfg(test)]
mod tests {
    use cobaltrdp::rdp::vc::ChannelControlFlags;

    use super::*;

    #[test]
    fn channel_header_is_stripped() {
        let mut data = Vec::new();
        vc::ChannelPduHeader::whole(3).to_buffer(&mut data).unwrap();
        data.extend_from_slice(&[0x01, 0x02, 0x03]);

        let (header, payload) = strip_channel_header(data.as_slice()).unwrap();

        assert_eq!(3, header.total_length);
        assert!(header.flags.contains(ChannelControlFlags::FLAG_FIRST));
        assert_eq!(vec![0x01, 0x02, 0x03], payload);
    }
}
