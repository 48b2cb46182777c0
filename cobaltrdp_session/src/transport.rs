mod channels;

pub use self::channels::{
    strip_channel_header, ChannelIdentificators, StaticVirtualChannelTransport,
};

use std::io;

use bytes::BytesMut;
use cobaltrdp::credssp::ts_request::TsRequest;
use cobaltrdp::rdp::headers::{
    BasicSecurityHeader, BasicSecurityHeaderFlags, ShareControlHeader, ShareControlPdu,
    ShareDataHeader, ShareDataPdu,
};
use cobaltrdp::{mcs, McsPdu, PduParsing};

use crate::{RdpError, RdpResult};

/// One layer of the outbound/inbound framing stack.
pub trait Encoder {
    type Item;
    type Error;

    fn encode(&mut self, item: Self::Item, stream: impl io::Write) -> Result<(), Self::Error>;
}

pub trait Decoder {
    type Item;
    type Error;

    fn decode(&mut self, stream: impl io::Read) -> Result<Self::Item, Self::Error>;
}

/// TPKT + X.224 data TPDU framing, the bottom of the slow path.
#[derive(Default, Copy, Clone, Debug)]
pub struct DataTransport;

impl Encoder for DataTransport {
    type Item = BytesMut;
    type Error = RdpError;

    fn encode(&mut self, data: Self::Item, mut stream: impl io::Write) -> RdpResult<()> {
        cobaltrdp::x224::Data::new(data.len()).to_buffer(&mut stream)?;
        stream.write_all(data.as_ref())?;
        stream.flush()?;

        Ok(())
    }
}

impl Decoder for DataTransport {
    type Item = BytesMut;
    type Error = RdpError;

    fn decode(&mut self, mut stream: impl io::Read) -> RdpResult<Self::Item> {
        let data_pdu = cobaltrdp::x224::Data::from_buffer(&mut stream)?;

        let mut data = BytesMut::with_capacity(data_pdu.data_length);
        data.resize(data_pdu.data_length, 0x00);
        stream.read_exact(&mut data)?;

        Ok(data)
    }
}

/// MCS domain PDUs over the data transport.
#[derive(Default, Copy, Clone, Debug)]
pub struct McsTransport(DataTransport);

impl Encoder for McsTransport {
    type Item = McsPdu;
    type Error = RdpError;

    fn encode(&mut self, mcs_pdu: Self::Item, mut stream: impl io::Write) -> RdpResult<()> {
        let mut mcs_pdu_buffer = BytesMut::with_capacity(mcs_pdu.buffer_length());
        mcs_pdu_buffer.resize(mcs_pdu.buffer_length(), 0x00);
        mcs_pdu.to_buffer(mcs_pdu_buffer.as_mut())?;

        self.0.encode(mcs_pdu_buffer, &mut stream)
    }
}

impl Decoder for McsTransport {
    type Item = McsPdu;
    type Error = RdpError;

    fn decode(&mut self, mut stream: impl io::Read) -> RdpResult<Self::Item> {
        let data = self.0.decode(&mut stream)?;

        Ok(McsPdu::from_buffer(data.as_ref())?)
    }
}

/// Channel-addressed send/receive: Send-Data-Request out, Send-Data-Indication
/// in. A disconnect ultimatum surfaces as a session-level error here.
#[derive(Copy, Clone, Debug)]
pub struct SendDataContextTransport {
    channel_ids: ChannelIdentificators,
}

impl SendDataContextTransport {
    pub fn new(initiator_id: u16, channel_id: u16) -> Self {
        Self {
            channel_ids: ChannelIdentificators {
                initiator_id,
                channel_id,
            },
        }
    }

}

impl Encoder for SendDataContextTransport {
    type Item = Vec<u8>;
    type Error = RdpError;

    fn encode(&mut self, pdu: Self::Item, mut stream: impl io::Write) -> RdpResult<()> {
        let send_data_context = mcs::SendDataContext::new(
            self.channel_ids.initiator_id,
            self.channel_ids.channel_id,
            pdu.len(),
        );

        let mcs_pdu = McsPdu::SendDataRequest(send_data_context);
        let mut mcs_pdu_buffer = BytesMut::with_capacity(mcs_pdu.buffer_length() + pdu.len());
        mcs_pdu_buffer.resize(mcs_pdu.buffer_length(), 0x00);
        mcs_pdu.to_buffer(mcs_pdu_buffer.as_mut())?;
        mcs_pdu_buffer.extend_from_slice(pdu.as_ref());

        DataTransport.encode(mcs_pdu_buffer, &mut stream)
    }
}

impl Decoder for SendDataContextTransport {
    type Item = (ChannelIdentificators, Vec<u8>);
    type Error = RdpError;

    fn decode(&mut self, mut stream: impl io::Read) -> RdpResult<Self::Item> {
        let data = DataTransport.decode(&mut stream)?;
        let mut cursor = data.as_ref();

        match McsPdu::from_buffer(&mut cursor)? {
            McsPdu::SendDataIndication(send_data_context) => {
                if cursor.len() < send_data_context.pdu_length {
                    return Err(RdpError::InvalidResponse(format!(
                        "Send Data Indication is shorter than its declared length: {} < {}",
                        cursor.len(),
                        send_data_context.pdu_length
                    )));
                }

                Ok((
                    ChannelIdentificators {
                        initiator_id: send_data_context.initiator_id,
                        channel_id: send_data_context.channel_id,
                    },
                    cursor[..send_data_context.pdu_length].to_vec(),
                ))
            }
            McsPdu::DisconnectProviderUltimatum(reason) => Err(RdpError::UnexpectedDisconnection(
                format!("disconnect provider ultimatum, reason {:?}", reason),
            )),
            mcs_pdu => Err(RdpError::UnexpectedPdu(format!(
                "expected Send Data Indication, got {}",
                mcs_pdu.as_short_name()
            ))),
        }
    }
}

/// The CredSSP envelope over the TLS stream. Inbound messages are sniffed by
/// their DER length prefix since TSRequests are not TPKT-framed.
#[derive(Default)]
pub struct TsRequestTransport;

impl Encoder for TsRequestTransport {
    type Item = TsRequest;
    type Error = RdpError;

    fn encode(&mut self, ts_request: Self::Item, mut stream: impl io::Write) -> RdpResult<()> {
        let mut buffer = Vec::with_capacity(usize::from(ts_request.buffer_len()));
        ts_request
            .encode_ts_request(&mut buffer)
            .map_err(RdpError::TsRequestError)?;

        stream.write_all(buffer.as_ref())?;
        stream.flush()?;

        Ok(())
    }
}

impl Decoder for TsRequestTransport {
    type Item = TsRequest;
    type Error = RdpError;

    fn decode(&mut self, mut stream: impl io::Read) -> RdpResult<Self::Item> {
        let mut buffer =
            vec![0x00; cobaltrdp::credssp::ts_request::MAX_TS_REQUEST_LENGTH_BUFFER_SIZE];
        stream.read_exact(&mut buffer)?;

        let ts_request_length =
            TsRequest::read_length(buffer.as_slice()).map_err(RdpError::TsRequestError)?;
        buffer.resize(ts_request_length, 0x00);
        stream
            .read_exact(&mut buffer[cobaltrdp::credssp::ts_request::MAX_TS_REQUEST_LENGTH_BUFFER_SIZE..])?;

        TsRequest::from_buffer(buffer.as_ref()).map_err(RdpError::TsRequestError)
    }
}

/// Share-control framing on the global channel. Standard RDP security slips
/// its 4-byte header in between the MCS layer and the share-control header;
/// the `enhanced_security` flag decides whether that header exists at all.
#[derive(Copy, Clone, Debug)]
pub struct ShareControlHeaderTransport {
    send_data_transport: SendDataContextTransport,
    enhanced_security: bool,
    pdu_source: u16,
    share_id: u32,
}

impl ShareControlHeaderTransport {
    pub fn new(
        send_data_transport: SendDataContextTransport,
        pdu_source: u16,
        enhanced_security: bool,
    ) -> Self {
        Self {
            send_data_transport,
            enhanced_security,
            pdu_source,
            share_id: 0,
        }
    }

    pub fn set_share_id(&mut self, share_id: u32) {
        self.share_id = share_id;
    }

    /// Parses an already-demultiplexed global-channel payload, honoring the
    /// security-header rule the transport was built with.
    pub fn decode_from_pdu(&mut self, pdu: &[u8]) -> RdpResult<ShareControlHeader> {
        let mut pdu = pdu;

        if !self.enhanced_security {
            let _security_header =
                BasicSecurityHeader::from_buffer(&mut pdu).map_err(RdpError::ShareControlError)?;
        }

        ShareControlHeader::from_buffer(pdu).map_err(RdpError::ShareControlError)
    }
}

impl Encoder for ShareControlHeaderTransport {
    type Item = ShareControlPdu;
    type Error = RdpError;

    fn encode(&mut self, pdu: Self::Item, mut stream: impl io::Write) -> RdpResult<()> {
        let share_control_header = ShareControlHeader::new(pdu, self.pdu_source, self.share_id);

        let mut buffer = Vec::with_capacity(share_control_header.buffer_length());
        if !self.enhanced_security {
            BasicSecurityHeader::new(BasicSecurityHeaderFlags::empty())
                .to_buffer(&mut buffer)
                .map_err(RdpError::ShareControlError)?;
        }
        share_control_header
            .to_buffer(&mut buffer)
            .map_err(RdpError::ShareControlError)?;

        self.send_data_transport.encode(buffer, &mut stream)
    }
}

impl Decoder for ShareControlHeaderTransport {
    type Item = ShareControlHeader;
    type Error = RdpError;

    fn decode(&mut self, mut stream: impl io::Read) -> RdpResult<Self::Item> {
        let (_channel_ids, pdu) = self.send_data_transport.decode(&mut stream)?;
        let mut pdu = pdu.as_slice();

        if !self.enhanced_security {
            let _security_header =
                BasicSecurityHeader::from_buffer(&mut pdu).map_err(RdpError::ShareControlError)?;
        }

        ShareControlHeader::from_buffer(pdu).map_err(RdpError::ShareControlError)
    }
}

/// Share-data framing on top of the share-control transport.
#[derive(Copy, Clone, Debug)]
pub struct ShareDataHeaderTransport(pub ShareControlHeaderTransport);

impl ShareDataHeaderTransport {
    pub fn new(transport: ShareControlHeaderTransport) -> Self {
        Self(transport)
    }
}

impl Encoder for ShareDataHeaderTransport {
    type Item = ShareDataPdu;
    type Error = RdpError;

    fn encode(&mut self, pdu: Self::Item, mut stream: impl io::Write) -> RdpResult<()> {
        self.0
            .encode(ShareControlPdu::Data(ShareDataHeader::new(pdu)), &mut stream)
    }
}

impl Decoder for ShareDataHeaderTransport {
    type Item = ShareDataPdu;
    type Error = RdpError;

    fn decode(&mut self, mut stream: impl io::Read) -> RdpResult<Self::Item> {
        let share_control_header = self.0.decode(&mut stream)?;

        match share_control_header.share_control_pdu {
            ShareControlPdu::Data(share_data_header) => Ok(share_data_header.share_data_pdu),
            pdu => Err(RdpError::UnexpectedPdu(format!(
                "expected a Data PDU, got {}",
                pdu.as_short_name()
            ))),
        }
    }
}
