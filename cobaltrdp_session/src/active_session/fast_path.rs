#[cfg(test)]
mod tests;

use byteorder::{LittleEndian, WriteBytesExt};
use cobaltrdp::fast_path::{FastPathError, FastPathHeader, FastPathUpdatePdu, UpdateCode};
use log::{debug, warn};
use num_traits::ToPrimitive as _;

use super::UpdateFrame;
use crate::RdpResult;

/// Turns inbound FastPath records into normalized update frames.
pub struct Processor;

impl Processor {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&mut self, header: &FastPathHeader, payload: &[u8]) -> RdpResult<UpdateFrame> {
        debug!("Got FastPath header: {:?}", header);

        let update_pdu = FastPathUpdatePdu::from_buffer(payload)?;

        if update_pdu.compression_flags.is_some() {
            // bulk decompression is a consumer concern; the flags byte would
            // break the uniform frame layout, so it is dropped with a warning
            warn!("Got a compressed FastPath update; passing the payload through undecompressed");
        }

        normalize_fast_path_update(update_pdu)
    }
}

/// Rebuilds the update as the uniform frame layout. A bitmap update gets the
/// synthetic update-type word slow-path updates already carry, so consumers
/// see one shape.
fn normalize_fast_path_update(update_pdu: FastPathUpdatePdu) -> RdpResult<UpdateFrame> {
    let insert_update_type = update_pdu.update_code == UpdateCode::Bitmap;

    let size = if insert_update_type {
        u16::try_from(update_pdu.data.len())
            .ok()
            .and_then(|size| size.checked_add(2))
            .ok_or(FastPathError::SizeOverflow)?
    } else {
        u16::try_from(update_pdu.data.len()).map_err(|_| FastPathError::SizeOverflow)?
    };

    let mut data = Vec::with_capacity(3 + usize::from(size));
    data.push(update_pdu.update_code.to_u8().unwrap());
    data.write_u16::<LittleEndian>(size)?;
    if insert_update_type {
        data.write_u16::<LittleEndian>(UPDATE_TYPE_BITMAP)?;
    }
    data.extend_from_slice(update_pdu.data.as_ref());

    Ok(UpdateFrame {
        update_code: update_pdu.update_code,
        data,
    })
}

const UPDATE_TYPE_BITMAP: u16 = 0x0001;
