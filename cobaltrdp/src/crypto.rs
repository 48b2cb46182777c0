pub mod rc4;

use std::io;

use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;
use sha2::Sha256;

pub const HASH_SIZE: usize = 16;
pub const SHA256_SIZE: usize = 32;

pub fn compute_md4(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut result = [0x00; HASH_SIZE];
    result.clone_from_slice(Md4::digest(data).as_ref());

    result
}

pub fn compute_md5(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut result = [0x00; HASH_SIZE];
    result.clone_from_slice(Md5::digest(data).as_ref());

    result
}

pub fn compute_sha256(data: &[u8]) -> [u8; SHA256_SIZE] {
    let mut result = [0x00; SHA256_SIZE];
    result.clone_from_slice(Sha256::digest(data).as_ref());

    result
}

pub fn compute_hmac_md5(key: &[u8], input: &[u8]) -> io::Result<[u8; HASH_SIZE]> {
    let mut mac = Hmac::<Md5>::new_from_slice(key).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("failed to compute HMAC-MD5: {}", e),
        )
    })?;
    mac.update(input);

    let mut result = [0x00; HASH_SIZE];
    result.clone_from_slice(mac.finalize().into_bytes().as_ref());

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 1320 appendix A.5 test suite, plus block-boundary lengths.
    #[test]
    fn md4_matches_rfc1320_known_answers() {
        assert_eq!(
            compute_md4(b""),
            [
                0x31, 0xd6, 0xcf, 0xe0, 0xd1, 0x6a, 0xe9, 0x31, 0xb7, 0x3c, 0x59, 0xd7, 0xe0,
                0xc0, 0x89, 0xc0
            ]
        );
        assert_eq!(
            compute_md4(b"abc"),
            [
                0xa4, 0x48, 0x01, 0x7a, 0xaf, 0x21, 0xd8, 0x52, 0x5f, 0xc1, 0x0a, 0xe8, 0x7a,
                0xa6, 0x72, 0x9d
            ]
        );
        assert_eq!(
            compute_md4(b"12345678901234567890123456789012345678901234567890123456789012345678901234567890"),
            [
                0xe3, 0x3b, 0x4d, 0xdc, 0x9c, 0x38, 0xf2, 0x19, 0x9c, 0x3e, 0x7b, 0x16, 0x4f,
                0xcc, 0x05, 0x36
            ]
        );
    }

    // MD4 must behave at every padding boundary: one block minus the
    // mandatory padding (55), exactly at the boundary (56), the block edge
    // (63/64), and the same points of the second block (119/120).
    #[test]
    fn md4_handles_block_boundary_lengths() {
        for len in [0, 55, 56, 63, 64, 119, 120, 150] {
            let data = vec![0x61; len];
            let digest = compute_md4(&data);

            assert_eq!(HASH_SIZE, digest.len());
            assert_eq!(digest, compute_md4(&data), "digest must be deterministic");
            if len > 0 {
                assert_ne!(digest, compute_md4(&data[..len - 1]));
            }
        }
    }

    // RFC 2104 test vector #1.
    #[test]
    fn hmac_md5_matches_rfc2104_known_answer() {
        let key = [0x0b; 16];

        assert_eq!(
            compute_hmac_md5(key.as_ref(), b"Hi There").unwrap(),
            [
                0x92, 0x94, 0x72, 0x7a, 0x36, 0x38, 0xbb, 0x1c, 0x13, 0xf4, 0x8e, 0xf8, 0x15,
                0x8b, 0xfc, 0x9d
            ]
        );
    }

    #[test]
    fn sha256_matches_known_answer() {
        assert_eq!(
            compute_sha256(b"abc"),
            [
                0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d,
                0xae, 0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10,
                0xff, 0x61, 0xf2, 0x00, 0x15, 0xad
            ]
        );
    }
}
