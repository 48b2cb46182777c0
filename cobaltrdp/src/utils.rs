#[macro_export]
macro_rules! try_read_optional {
    ($e:expr, $ret:expr) => {
        match $e {
            Ok(v) => v,
            Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok($ret);
            }
            Err(e) => return Err(From::from(e)),
        }
    };
}

#[macro_export]
macro_rules! try_write_optional {
    ($val:expr, $f:expr) => {
        if let Some(ref val) = $val {
            $f(val)?
        } else {
            return Ok(());
        }
    };
}

#[macro_export]
macro_rules! impl_from_error {
    ($from_e:ty, $to_e:ty, $to_e_variant:expr) => {
        impl From<$from_e> for $to_e {
            fn from(e: $from_e) -> Self {
                $to_e_variant(e)
            }
        }
    };
}

pub fn string_to_utf16(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .flat_map(|i| i.to_le_bytes().to_vec())
        .collect()
}

pub fn bytes_to_utf16_string(value: &[u8]) -> String {
    let value_u16: Vec<u16> = value
        .chunks_exact(2)
        .map(|i| u16::from_le_bytes([i[0], i[1]]))
        .collect();

    String::from_utf16_lossy(value_u16.as_ref())
}

/// ASCII-only uppercasing, the transform NTOWFv2 applies to the user name.
pub fn uppercase_ascii(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_encoding_round_trips_ascii_strings() {
        let expected = "RDP test string";

        assert_eq!(
            expected,
            bytes_to_utf16_string(string_to_utf16(expected).as_ref())
        );
    }

    #[test]
    fn utf16_encoding_is_little_endian() {
        assert_eq!(vec![0x41, 0x00, 0x42, 0x00], string_to_utf16("AB"));
    }

    #[test]
    fn uppercase_ascii_leaves_non_ascii_untouched() {
        assert_eq!("USERÉ", uppercase_ascii("userÉ"));
    }
}
