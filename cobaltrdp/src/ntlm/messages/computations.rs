#[cfg(test)]
mod tests;

use std::io;

use byteorder::{LittleEndian, WriteBytesExt};
use chrono::Utc;
use rand::rngs::OsRng;
use rand::Rng as _;

use super::av_pair::{AvPair, MsvAvFlags, AV_PAIR_EOL, AV_PAIR_TIMESTAMP};
use crate::crypto::{compute_hmac_md5, compute_md4, compute_md5, HASH_SIZE};
use crate::ntlm::{CHALLENGE_SIZE, LM_CHALLENGE_RESPONSE_BUFFER_SIZE, MESSAGE_INTEGRITY_CHECK_SIZE};
use crate::sspi::{self, CredentialsBuffers, SspiError, SspiErrorType};
use crate::utils;

const NT_V2_RESPONSE_BASE_SIZE: usize = 28;

/// Offset between the Windows FILETIME epoch (1601-01-01) and the Unix epoch,
/// in 100-nanosecond ticks.
const FILETIME_UNIX_EPOCH_DELTA: u64 = 116_444_736_000_000_000;

pub fn generate_challenge() -> [u8; CHALLENGE_SIZE] {
    OsRng.gen::<[u8; CHALLENGE_SIZE]>()
}

/// The current time as a Windows FILETIME: 100-ns ticks since 1601-01-01 UTC.
pub fn generate_timestamp() -> u64 {
    let unix_nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default().max(0) as u64;

    unix_nanos / 100 + FILETIME_UNIX_EPOCH_DELTA
}

/// Extracts the server timestamp from the challenge target info. Returns the
/// timestamp to use for the NTv2 response and whether the server provided one
/// itself, which is what makes the MIC mandatory.
pub fn get_challenge_timestamp(target_info: &[u8]) -> sspi::Result<(u64, bool)> {
    let av_pairs = AvPair::buffer_to_av_pairs(target_info)?;

    if let Some(AvPair::Timestamp(value)) = av_pairs
        .iter()
        .find(|av_pair| av_pair.as_u16() == AV_PAIR_TIMESTAMP)
    {
        Ok((*value, true))
    } else {
        Ok((generate_timestamp(), false))
    }
}

/// Builds the target info of the authenticate message from the challenge's:
/// the original pairs minus the terminator, an AV_FLAGS pair announcing the
/// MIC when one is required, then the terminating pair and reserved padding.
pub fn get_authenticate_target_info(target_info: &[u8], mic_required: bool) -> sspi::Result<Vec<u8>> {
    let mut av_pairs = AvPair::buffer_to_av_pairs(target_info)?;

    av_pairs.retain(|av_pair| av_pair.as_u16() != AV_PAIR_EOL);

    if mic_required {
        av_pairs.push(AvPair::Flags(MsvAvFlags::MESSAGE_INTEGRITY_CHECK.bits()));
    }

    let mut authenticate_target_info = AvPair::list_to_buffer(&av_pairs)?;

    // AvEOL ([0x00; 4]) plus reserved ([0x00; 4])
    authenticate_target_info.write_u64::<LittleEndian>(0x00)?;

    Ok(authenticate_target_info)
}

pub fn generate_signing_key(exported_session_key: &[u8], sign_magic: &[u8]) -> [u8; HASH_SIZE] {
    let mut value = exported_session_key.to_vec();
    value.extend_from_slice(sign_magic);

    compute_md5(value.as_ref())
}

pub fn compute_message_integrity_check(
    negotiate_message: &[u8],
    challenge_message: &[u8],
    authenticate_message: &[u8],
    exported_session_key: &[u8],
) -> io::Result<[u8; MESSAGE_INTEGRITY_CHECK_SIZE]> {
    let mut message_integrity_check = negotiate_message.to_vec();
    message_integrity_check.extend_from_slice(challenge_message);
    message_integrity_check.extend_from_slice(authenticate_message);

    compute_hmac_md5(exported_session_key, message_integrity_check.as_ref())
}

/// NTOWFv2: HMAC-MD5 keyed with MD4 of the UTF-16LE password, over the
/// ASCII-uppercased user name concatenated with the (unchanged) domain, both
/// UTF-16LE. LMOWFv2 is the identical value.
pub fn compute_ntlm_v2_hash(identity: &CredentialsBuffers) -> sspi::Result<[u8; HASH_SIZE]> {
    if identity.is_empty() {
        return Err(SspiError::new(
            SspiErrorType::InvalidToken,
            String::from("got empty identity"),
        ));
    }

    let hmac_key = compute_md4(&identity.password);

    let user = utils::bytes_to_utf16_string(identity.user.as_ref());
    let mut user_uppercase_with_domain =
        utils::string_to_utf16(utils::uppercase_ascii(user.as_str()).as_str());
    user_uppercase_with_domain.extend(&identity.domain);

    Ok(compute_hmac_md5(&hmac_key, &user_uppercase_with_domain)?)
}

pub fn compute_lm_v2_response(
    client_challenge: &[u8],
    server_challenge: &[u8],
    ntlm_v2_hash: &[u8],
) -> sspi::Result<[u8; LM_CHALLENGE_RESPONSE_BUFFER_SIZE]> {
    let mut lm_challenge_data = [0x00; CHALLENGE_SIZE * 2];
    lm_challenge_data[0..CHALLENGE_SIZE].clone_from_slice(server_challenge);
    lm_challenge_data[CHALLENGE_SIZE..].clone_from_slice(client_challenge);

    let mut lm_challenge_response = [0x00; LM_CHALLENGE_RESPONSE_BUFFER_SIZE];
    lm_challenge_response[0..HASH_SIZE]
        .clone_from_slice(compute_hmac_md5(ntlm_v2_hash, &lm_challenge_data)?.as_ref());
    lm_challenge_response[HASH_SIZE..].clone_from_slice(client_challenge);

    Ok(lm_challenge_response)
}

/// Computes the NTv2 challenge response and the key-exchange key. The
/// response is the NT proof string followed by the `temp` blob it was
/// computed over.
pub fn compute_ntlm_v2_response(
    client_challenge: &[u8],
    server_challenge: &[u8],
    target_info: &[u8],
    ntlm_v2_hash: &[u8],
    timestamp: u64,
) -> sspi::Result<(Vec<u8>, [u8; HASH_SIZE])> {
    let mut ntlm_v2_temp = Vec::with_capacity(NT_V2_RESPONSE_BASE_SIZE + target_info.len());
    ntlm_v2_temp.write_u8(1)?; // RespType
    ntlm_v2_temp.write_u8(1)?; // HighRespType
    ntlm_v2_temp.write_u16::<LittleEndian>(0)?; // Reserved1
    ntlm_v2_temp.write_u32::<LittleEndian>(0)?; // Reserved2
    ntlm_v2_temp.write_u64::<LittleEndian>(timestamp)?;
    ntlm_v2_temp.extend_from_slice(client_challenge);
    ntlm_v2_temp.write_u32::<LittleEndian>(0)?; // Reserved3
    ntlm_v2_temp.extend_from_slice(target_info);

    let mut nt_proof_input = server_challenge.to_vec();
    nt_proof_input.extend(ntlm_v2_temp.as_slice());
    let nt_proof = compute_hmac_md5(ntlm_v2_hash, nt_proof_input.as_ref())?;

    let mut nt_challenge_response = nt_proof.to_vec();
    nt_challenge_response.append(ntlm_v2_temp.as_mut());

    // the session base key doubles as the key-exchange key in NTLMv2
    let key_exchange_key = compute_hmac_md5(ntlm_v2_hash, nt_proof.as_ref())?;

    Ok((nt_challenge_response, key_exchange_key))
}
