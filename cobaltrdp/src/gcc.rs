#[cfg(test)]
mod tests;

pub mod conference_create;

mod cluster_data;
mod core_data;
mod message_channel_data;
mod monitor_data;
mod multi_transport_channel_data;
mod network_data;
mod security_data;

pub use self::cluster_data::{ClientClusterData, ClusterDataError, RedirectionVersion};
pub use self::conference_create::{ConferenceCreateRequest, ConferenceCreateResponse};
pub use self::core_data::client::{
    ClientCoreData, ClientCoreOptionalData, ClientEarlyCapabilityFlags, ColorDepth,
    ConnectionType, HighColorDepth, KeyboardType, SecureAccessSequence, SupportedColorDepths,
};
pub use self::core_data::server::{ServerCoreData, ServerCoreOptionalData, ServerEarlyCapabilityFlags};
pub use self::core_data::{CoreDataError, RdpVersion};
pub use self::message_channel_data::ServerMessageChannelData;
pub use self::monitor_data::{
    ClientMonitorData, Monitor, MonitorDataError, MonitorFlags, MONITOR_COUNT_SIZE, MONITOR_SIZE,
};
pub use self::multi_transport_channel_data::{MultiTransportChannelData, MultiTransportFlags};
pub use self::network_data::{
    Channel, ChannelOptions, ClientNetworkData, NetworkDataError, ServerNetworkData,
};
pub use self::security_data::{
    ClientSecurityData, EncryptionLevel, EncryptionMethod, SecurityDataError, ServerSecurityData,
};

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use failure::Fail;
use num_traits::{FromPrimitive, ToPrimitive};

use crate::PduParsing;

macro_rules! user_header_try {
    ($e:expr) => {
        match $e {
            Ok(user_header) => user_header,
            Err(GccError::IOError(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    };
}

const GCC_TYPE_SIZE: usize = 2;
const USER_DATA_HEADER_SIZE: usize = 4;

/// The client user-data blocks embedded in the MCS Connect-Initial. Core,
/// security and network are what servers actually require.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientGccBlocks {
    pub core: ClientCoreData,
    pub security: ClientSecurityData,
    pub network: Option<ClientNetworkData>,
    pub cluster: Option<ClientClusterData>,
    pub monitor: Option<ClientMonitorData>,
    pub multi_transport_channel: Option<MultiTransportChannelData>,
}

impl ClientGccBlocks {
    pub fn channel_names(&self) -> Vec<Channel> {
        self.network
            .as_ref()
            .map(|network| network.channels.clone())
            .unwrap_or_default()
    }
}

impl PduParsing for ClientGccBlocks {
    type Error = GccError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let mut core = None;
        let mut security = None;
        let mut network = None;
        let mut cluster = None;
        let mut monitor = None;
        let mut multi_transport_channel = None;

        loop {
            let user_header = user_header_try!(UserDataHeader::<ClientGccType>::from_buffer(&mut buffer));
            let block = user_header.block_data.as_slice();

            match user_header.block_type {
                ClientGccType::CoreData => core = Some(ClientCoreData::from_buffer(block)?),
                ClientGccType::SecurityData => {
                    security = Some(ClientSecurityData::from_buffer(block)?)
                }
                ClientGccType::NetworkData => network = Some(ClientNetworkData::from_buffer(block)?),
                ClientGccType::ClusterData => cluster = Some(ClientClusterData::from_buffer(block)?),
                ClientGccType::MonitorData => monitor = Some(ClientMonitorData::from_buffer(block)?),
                ClientGccType::MultiTransportChannelData => {
                    multi_transport_channel = Some(MultiTransportChannelData::from_buffer(block)?)
                }
                // the client never parses its own message-channel block
                ClientGccType::MessageChannelData => (),
            };
        }

        Ok(Self {
            core: core.ok_or(GccError::RequiredClientDataBlockIsAbsent(ClientGccType::CoreData))?,
            security: security
                .ok_or(GccError::RequiredClientDataBlockIsAbsent(ClientGccType::SecurityData))?,
            network,
            cluster,
            monitor,
            multi_transport_channel,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        UserDataHeader::from_gcc_block(ClientGccType::CoreData, &self.core)?.to_buffer(&mut buffer)?;
        UserDataHeader::from_gcc_block(ClientGccType::SecurityData, &self.security)?
            .to_buffer(&mut buffer)?;

        if let Some(ref network) = self.network {
            UserDataHeader::from_gcc_block(ClientGccType::NetworkData, network)?.to_buffer(&mut buffer)?;
        }
        if let Some(ref cluster) = self.cluster {
            UserDataHeader::from_gcc_block(ClientGccType::ClusterData, cluster)?.to_buffer(&mut buffer)?;
        }
        if let Some(ref monitor) = self.monitor {
            UserDataHeader::from_gcc_block(ClientGccType::MonitorData, monitor)?.to_buffer(&mut buffer)?;
        }
        if let Some(ref multi_transport_channel) = self.multi_transport_channel {
            UserDataHeader::from_gcc_block(
                ClientGccType::MultiTransportChannelData,
                multi_transport_channel,
            )?
            .to_buffer(&mut buffer)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        let mut size =
            self.core.buffer_length() + self.security.buffer_length() + USER_DATA_HEADER_SIZE * 2;

        if let Some(ref network) = self.network {
            size += network.buffer_length() + USER_DATA_HEADER_SIZE;
        }
        if let Some(ref cluster) = self.cluster {
            size += cluster.buffer_length() + USER_DATA_HEADER_SIZE;
        }
        if let Some(ref monitor) = self.monitor {
            size += monitor.buffer_length() + USER_DATA_HEADER_SIZE;
        }
        if let Some(ref multi_transport_channel) = self.multi_transport_channel {
            size += multi_transport_channel.buffer_length() + USER_DATA_HEADER_SIZE;
        }

        size
    }
}

/// The server user-data blocks of the MCS Connect-Response.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerGccBlocks {
    pub core: ServerCoreData,
    pub network: ServerNetworkData,
    pub security: ServerSecurityData,
    pub message_channel: Option<ServerMessageChannelData>,
    pub multi_transport_channel: Option<MultiTransportChannelData>,
}

impl ServerGccBlocks {
    pub fn channel_ids(&self) -> Vec<u16> {
        self.network.channel_ids.clone()
    }

    pub fn global_channel_id(&self) -> u16 {
        self.network.io_channel
    }
}

impl PduParsing for ServerGccBlocks {
    type Error = GccError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let mut core = None;
        let mut network = None;
        let mut security = None;
        let mut message_channel = None;
        let mut multi_transport_channel = None;

        loop {
            let user_header = user_header_try!(UserDataHeader::<ServerGccType>::from_buffer(&mut buffer));
            let block = user_header.block_data.as_slice();

            match user_header.block_type {
                ServerGccType::CoreData => core = Some(ServerCoreData::from_buffer(block)?),
                ServerGccType::NetworkData => network = Some(ServerNetworkData::from_buffer(block)?),
                ServerGccType::SecurityData => {
                    security = Some(ServerSecurityData::from_buffer(block)?)
                }
                ServerGccType::MessageChannelData => {
                    message_channel = Some(ServerMessageChannelData::from_buffer(block)?)
                }
                ServerGccType::MultiTransportChannelData => {
                    multi_transport_channel = Some(MultiTransportChannelData::from_buffer(block)?)
                }
            };
        }

        Ok(Self {
            core: core.ok_or(GccError::RequiredServerDataBlockIsAbsent(ServerGccType::CoreData))?,
            network: network
                .ok_or(GccError::RequiredServerDataBlockIsAbsent(ServerGccType::NetworkData))?,
            security: security
                .ok_or(GccError::RequiredServerDataBlockIsAbsent(ServerGccType::SecurityData))?,
            message_channel,
            multi_transport_channel,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        UserDataHeader::from_gcc_block(ServerGccType::CoreData, &self.core)?.to_buffer(&mut buffer)?;
        UserDataHeader::from_gcc_block(ServerGccType::NetworkData, &self.network)?
            .to_buffer(&mut buffer)?;
        UserDataHeader::from_gcc_block(ServerGccType::SecurityData, &self.security)?
            .to_buffer(&mut buffer)?;

        if let Some(ref message_channel) = self.message_channel {
            UserDataHeader::from_gcc_block(ServerGccType::MessageChannelData, message_channel)?
                .to_buffer(&mut buffer)?;
        }
        if let Some(ref multi_transport_channel) = self.multi_transport_channel {
            UserDataHeader::from_gcc_block(
                ServerGccType::MultiTransportChannelData,
                multi_transport_channel,
            )?
            .to_buffer(&mut buffer)?;
        }

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        let mut size = self.core.buffer_length()
            + self.network.buffer_length()
            + self.security.buffer_length()
            + USER_DATA_HEADER_SIZE * 3;

        if let Some(ref message_channel) = self.message_channel {
            size += message_channel.buffer_length() + USER_DATA_HEADER_SIZE;
        }
        if let Some(ref multi_transport_channel) = self.multi_transport_channel {
            size += multi_transport_channel.buffer_length() + USER_DATA_HEADER_SIZE;
        }

        size
    }
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum ClientGccType {
    CoreData = 0xC001,
    SecurityData = 0xC002,
    NetworkData = 0xC003,
    ClusterData = 0xC004,
    MonitorData = 0xC005,
    MessageChannelData = 0xC006,
    MultiTransportChannelData = 0xC00A,
}

#[repr(u16)]
#[derive(Debug, Copy, Clone, PartialEq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub enum ServerGccType {
    CoreData = 0x0C01,
    SecurityData = 0x0C02,
    NetworkData = 0x0C03,
    MessageChannelData = 0x0C04,
    MultiTransportChannelData = 0x0C08,
}

#[derive(Debug)]
pub struct UserDataHeader<T: FromPrimitive + ToPrimitive> {
    block_type: T,
    block_data: Vec<u8>,
}

impl<T: FromPrimitive + ToPrimitive> UserDataHeader<T> {
    fn from_gcc_block<B: PduParsing>(block_type: T, gcc_block: &B) -> Result<Self, GccError>
    where
        GccError: From<<B as PduParsing>::Error>,
    {
        let mut block_data = Vec::with_capacity(gcc_block.buffer_length());
        gcc_block.to_buffer(&mut block_data)?;

        Ok(Self {
            block_type,
            block_data,
        })
    }

    fn block_length(&self) -> usize {
        self.block_data.len() + USER_DATA_HEADER_SIZE
    }
}

impl<T: FromPrimitive + ToPrimitive> PduParsing for UserDataHeader<T> {
    type Error = GccError;

    fn from_buffer(mut buffer: impl io::Read) -> Result<Self, Self::Error> {
        let block_type =
            T::from_u16(buffer.read_u16::<LittleEndian>()?).ok_or(GccError::InvalidGccType)?;
        let block_length = buffer.read_u16::<LittleEndian>()?;

        if block_length <= USER_DATA_HEADER_SIZE as u16 {
            return Err(GccError::IOError(io::Error::new(
                io::ErrorKind::InvalidData,
                "invalid user data header length",
            )));
        }

        let mut block_data = vec![0; block_length as usize - USER_DATA_HEADER_SIZE];
        buffer.read_exact(&mut block_data)?;

        Ok(Self {
            block_type,
            block_data,
        })
    }

    fn to_buffer(&self, mut buffer: impl io::Write) -> Result<(), Self::Error> {
        buffer.write_u16::<LittleEndian>(self.block_type.to_u16().unwrap())?;
        buffer.write_u16::<LittleEndian>(self.block_length() as u16)?;
        buffer.write_all(self.block_data.as_ref())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        GCC_TYPE_SIZE + self.block_data.len()
    }
}

#[derive(Debug, Fail)]
pub enum GccError {
    #[fail(display = "IO error: {}", _0)]
    IOError(#[fail(cause)] io::Error),
    #[fail(display = "core data block error: {}", _0)]
    CoreError(#[fail(cause)] CoreDataError),
    #[fail(display = "security data block error: {}", _0)]
    SecurityError(#[fail(cause)] SecurityDataError),
    #[fail(display = "network data block error: {}", _0)]
    NetworkError(#[fail(cause)] NetworkDataError),
    #[fail(display = "cluster data block error: {}", _0)]
    ClusterError(#[fail(cause)] ClusterDataError),
    #[fail(display = "monitor data block error: {}", _0)]
    MonitorError(#[fail(cause)] MonitorDataError),
    #[fail(display = "invalid GCC block type")]
    InvalidGccType,
    #[fail(display = "invalid conference create request: {}", _0)]
    InvalidConferenceCreateRequest(String),
    #[fail(display = "invalid conference create response: {}", _0)]
    InvalidConferenceCreateResponse(String),
    #[fail(display = "the client did not send the required GCC data block: {:?}", _0)]
    RequiredClientDataBlockIsAbsent(ClientGccType),
    #[fail(display = "the server did not send the required GCC data block: {:?}", _0)]
    RequiredServerDataBlockIsAbsent(ServerGccType),
}

impl_from_error!(io::Error, GccError, GccError::IOError);
impl_from_error!(CoreDataError, GccError, GccError::CoreError);
impl_from_error!(SecurityDataError, GccError, GccError::SecurityError);
impl_from_error!(NetworkDataError, GccError, GccError::NetworkError);
impl_from_error!(ClusterDataError, GccError, GccError::ClusterError);
impl_from_error!(MonitorDataError, GccError, GccError::MonitorError);
