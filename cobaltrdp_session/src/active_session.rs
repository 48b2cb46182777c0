pub mod fast_path;
pub mod x224;

use cobaltrdp::fast_path::UpdateCode;

use crate::RdpResult;

/// One normalized graphics update, whatever transport it arrived on: a
/// FastPath-style header byte (update code in the low nibble), a 16-bit
/// little-endian size, then the payload whose first word is the update type.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFrame {
    pub update_code: UpdateCode,
    pub data: Vec<u8>,
}

/// What a `get_update` call resolves to: a frame, or the server's clean end
/// of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Update(UpdateFrame),
    SessionEnded,
}

/// The seam an ancillary channel collaborator (audio redirection, display
/// control, …) plugs into: it gets the raw channel payload and may hand back
/// bytes to send on the same channel.
pub trait ChannelDataHandler {
    fn process_complete_data(&mut self, data: Vec<u8>) -> RdpResult<Option<Vec<u8>>>;
}
