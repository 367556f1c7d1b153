//! Hex text codec used for frames on the HTTP surface.

use crate::error::{FrameError, FrameResult};

/// Encodes bytes as upper-case hex with no separators.
#[inline]
pub fn encode_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Decodes hex text into bytes.
///
/// Either case is accepted and ASCII whitespace between digits is ignored, so
/// `"01 83 04"` and `"018304"` decode identically.
pub fn decode_hex(text: &str) -> FrameResult<Vec<u8>> {
    let digits: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    hex::decode(&digits).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { c, index } => {
            FrameError::InvalidHex { ch: c, index }
        }
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            FrameError::OddLength {
                digits: digits.len(),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_case_are_tolerated() {
        assert_eq!(decode_hex("01 83 04 40 f3").unwrap(), vec![0x01, 0x83, 0x04, 0x40, 0xF3]);
        assert_eq!(decode_hex("\t0A0b\n").unwrap(), vec![0x0A, 0x0B]);
    }

    #[test]
    fn odd_digit_count_is_rejected() {
        assert_eq!(decode_hex("018"), Err(FrameError::OddLength { digits: 3 }));
    }

    #[test]
    fn non_hex_characters_are_rejected() {
        assert!(matches!(
            decode_hex("01ZZ"),
            Err(FrameError::InvalidHex { ch: 'Z', .. })
        ));
    }

    #[test]
    fn encoding_is_upper_case() {
        assert_eq!(encode_hex(&[0xab, 0x01]), "AB01");
    }
}
