//! Plumbing for the RAIL (RemoteApp) static channel. The state machine keeps
//! the channel healthy and launches the configured program; windowing
//! semantics are deliberately not implemented.

#[cfg(test)]
mod tests;

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use cobaltrdp::PduParsing;
use log::debug;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive as _, ToPrimitive as _};

use crate::config::RemoteApp;
use crate::RdpResult;

const RAIL_PDU_HEADER_SIZE: usize = 4;
const HANDSHAKE_PDU_SIZE: usize = 4;
const CLIENT_STATUS_PDU_SIZE: usize = 4;

const CLIENT_BUILD_NUMBER: u32 = 0x00001db0;
const CLIENT_STATUS_ALLOW_LOCAL_MOVE_SIZE: u32 = 0x0000_0001;

/// Where the RAIL exchange currently stands.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RailState {
    Uninitialized,
    Initializing,
    SyncDesktop,
    WaitForData,
    ExecuteApp,
}

/// Drives the RAIL channel far enough that the server launches the RemoteApp
/// and the channel never wedges. Inbound orders that would require windowing
/// support are parsed and dropped.
pub struct RailHandler {
    state: RailState,
    remote_app: RemoteApp,
}

impl RailHandler {
    pub fn new(remote_app: RemoteApp) -> Self {
        Self {
            state: RailState::Uninitialized,
            remote_app,
        }
    }

    /// Marks the session as active; RAIL PDUs are only acted upon from here.
    pub fn start_initialization(&mut self) {
        if self.state == RailState::Uninitialized {
            self.state = RailState::Initializing;
        }
    }

    pub fn state(&self) -> RailState {
        self.state
    }

    /// Feeds one inbound RAIL channel payload through the state machine and
    /// returns the PDUs to send back on the channel.
    pub fn process(&mut self, mut input: &[u8]) -> RdpResult<Vec<Vec<u8>>> {
        let header = RailPduHeader::from_buffer(&mut input)?;

        let order_type = match RailOrderType::from_u16(header.order_type) {
            Some(order_type) => order_type,
            None => {
                debug!(
                    "Ignoring unknown RAIL order 0x{:04x} in state {:?}",
                    header.order_type, self.state
                );

                return Ok(Vec::new());
            }
        };

        match (self.state, order_type) {
            // system parameters arrive in any state and carry nothing we act on
            (_, RailOrderType::SysparamUpdate) => {
                debug!("Ignoring RAIL Sysparam Update in state {:?}", self.state);

                Ok(Vec::new())
            }
            (RailState::Initializing, RailOrderType::Handshake) => {
                let handshake = HandshakePdu::from_buffer(&mut input)?;
                debug!("Got RAIL Handshake PDU: {:?}", handshake);

                let replies = vec![
                    encode_rail_pdu(
                        RailOrderType::Handshake,
                        &HandshakePdu {
                            build_number: CLIENT_BUILD_NUMBER,
                        },
                    )?,
                    encode_rail_pdu(
                        RailOrderType::ClientStatus,
                        &ClientStatusPdu {
                            flags: CLIENT_STATUS_ALLOW_LOCAL_MOVE_SIZE,
                        },
                    )?,
                    encode_rail_pdu(RailOrderType::Exec, &ExecPdu::new(&self.remote_app))?,
                ];

                self.state = RailState::ExecuteApp;

                Ok(replies)
            }
            (RailState::ExecuteApp, RailOrderType::ExecResult) => {
                let exec_result = ExecResultPdu::from_buffer(&mut input)?;
                debug!("Got RAIL Exec Result PDU: {:?}", exec_result);

                self.state = RailState::WaitForData;

                Ok(Vec::new())
            }
            (state, order_type) => {
                debug!(
                    "Ignoring RAIL {:?} order in state {:?}",
                    order_type, state
                );

                Ok(Vec::new())
            }
        }
    }
}

fn encode_rail_pdu<T: PduParsing>(order_type: RailOrderType, pdu: &T) -> RdpResult<Vec<u8>>
where
    crate::RdpError: From<<T as PduParsing>::Error>,
{
    let header = RailPduHeader {
        order_type: order_type.to_u16().unwrap(),
        order_length: (RAIL_PDU_HEADER_SIZE + pdu.buffer_length()) as u16,
    };

    let mut buffer = Vec::with_capacity(usize::from(header.order_length));
    header.to_buffer(&mut buffer)?;
    pdu.to_buffer(&mut buffer)?;

    Ok(buffer)
}

/// TS_RAIL_PDU_HEADER.
#[derive(Debug, Clone, PartialEq)]
pub struct RailPduHeader {
    pub order_type: u16,
    pub order_length: u16,
}

impl PduParsing for RailPduHeader {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let order_type = stream.read_u16::<LittleEndian>()?;
        let order_length = stream.read_u16::<LittleEndian>()?;

        Ok(Self {
            order_type,
            order_length,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u16::<LittleEndian>(self.order_type)?;
        stream.write_u16::<LittleEndian>(self.order_length)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        RAIL_PDU_HEADER_SIZE
    }
}

#[derive(Debug, Copy, Clone, PartialEq, FromPrimitive, ToPrimitive)]
#[repr(u16)]
pub enum RailOrderType {
    Exec = 0x0001,
    Activate = 0x0002,
    SysparamUpdate = 0x0003,
    SysCommand = 0x0004,
    Handshake = 0x0005,
    NotifyEvent = 0x0006,
    WindowMove = 0x0008,
    LocalMoveSize = 0x0009,
    MinMaxInfo = 0x000a,
    ClientStatus = 0x000b,
    SysMenu = 0x000c,
    LangBarInfo = 0x000d,
    ExecResult = 0x0080,
    GetAppidReq = 0x000e,
    GetAppidResp = 0x000f,
    HandshakeEx = 0x0013,
}

/// TS_RAIL_ORDER_HANDSHAKE.
#[derive(Debug, Clone, PartialEq)]
pub struct HandshakePdu {
    pub build_number: u32,
}

impl PduParsing for HandshakePdu {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let build_number = stream.read_u32::<LittleEndian>()?;

        Ok(Self { build_number })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u32::<LittleEndian>(self.build_number)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        HANDSHAKE_PDU_SIZE
    }
}

/// TS_RAIL_ORDER_CLIENTSTATUS.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientStatusPdu {
    pub flags: u32,
}

impl PduParsing for ClientStatusPdu {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let flags = stream.read_u32::<LittleEndian>()?;

        Ok(Self { flags })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u32::<LittleEndian>(self.flags)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        CLIENT_STATUS_PDU_SIZE
    }
}

/// TS_RAIL_ORDER_EXEC: the RemoteApp launch request. All strings travel as
/// UTF-16LE without terminators.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecPdu {
    pub flags: u16,
    pub program: String,
    pub working_dir: String,
    pub args: String,
}

impl ExecPdu {
    fn new(remote_app: &RemoteApp) -> Self {
        Self {
            flags: 0,
            program: remote_app.program.clone(),
            working_dir: remote_app.working_dir.clone(),
            args: remote_app.args.clone(),
        }
    }
}

impl PduParsing for ExecPdu {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let flags = stream.read_u16::<LittleEndian>()?;
        let program_length = usize::from(stream.read_u16::<LittleEndian>()?);
        let working_dir_length = usize::from(stream.read_u16::<LittleEndian>()?);
        let args_length = usize::from(stream.read_u16::<LittleEndian>()?);

        let mut read_utf16 = |length: usize| -> io::Result<String> {
            let mut buffer = vec![0; length];
            stream.read_exact(buffer.as_mut())?;

            Ok(bytes_to_utf16_string(buffer.as_slice()))
        };

        let program = read_utf16(program_length)?;
        let working_dir = read_utf16(working_dir_length)?;
        let args = read_utf16(args_length)?;

        Ok(Self {
            flags,
            program,
            working_dir,
            args,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        let program = string_to_utf16(self.program.as_str());
        let working_dir = string_to_utf16(self.working_dir.as_str());
        let args = string_to_utf16(self.args.as_str());

        stream.write_u16::<LittleEndian>(self.flags)?;
        stream.write_u16::<LittleEndian>(program.len() as u16)?;
        stream.write_u16::<LittleEndian>(working_dir.len() as u16)?;
        stream.write_u16::<LittleEndian>(args.len() as u16)?;
        stream.write_all(program.as_ref())?;
        stream.write_all(working_dir.as_ref())?;
        stream.write_all(args.as_ref())?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        2 + 2 * 3
            + string_to_utf16(self.program.as_str()).len()
            + string_to_utf16(self.working_dir.as_str()).len()
            + string_to_utf16(self.args.as_str()).len()
    }
}

/// TS_RAIL_ORDER_EXEC_RESULT.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecResultPdu {
    pub flags: u16,
    pub exec_result: u16,
    pub raw_result: u32,
}

impl PduParsing for ExecResultPdu {
    type Error = io::Error;

    fn from_buffer(mut stream: impl io::Read) -> Result<Self, Self::Error> {
        let flags = stream.read_u16::<LittleEndian>()?;
        let exec_result = stream.read_u16::<LittleEndian>()?;
        let raw_result = stream.read_u32::<LittleEndian>()?;

        Ok(Self {
            flags,
            exec_result,
            raw_result,
        })
    }

    fn to_buffer(&self, mut stream: impl io::Write) -> Result<(), Self::Error> {
        stream.write_u16::<LittleEndian>(self.flags)?;
        stream.write_u16::<LittleEndian>(self.exec_result)?;
        stream.write_u32::<LittleEndian>(self.raw_result)?;

        Ok(())
    }

    fn buffer_length(&self) -> usize {
        8
    }
}

fn string_to_utf16(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .flat_map(|i| i.to_le_bytes().to_vec())
        .collect()
}

fn bytes_to_utf16_string(value: &[u8]) -> String {
    let value_u16: Vec<u16> = value
        .chunks_exact(2)
        .map(|i| u16::from_le_bytes([i[0], i[1]]))
        .collect();

    String::from_utf16_lossy(value_u16.as_ref()).trim_end_matches('\u{0}').into()
}
