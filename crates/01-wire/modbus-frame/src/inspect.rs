//! Best-effort frame parsing for display.
//!
//! [`inspect`] never fails. Whatever can be recovered from the text is
//! reported; fields that cannot be derived are `None` (serialized as `null`)
//! and the first decoding problem, if any, is kept in `problem`.

use serde::Serialize;

use crate::codec::encode_hex;
use crate::crc::crc16;
use crate::exception::ExceptionCode;
use crate::frame::{EXCEPTION_FLAG, MIN_FRAME_LEN};

/// Field-by-field view of a possibly broken frame.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDiagnostic {
    /// Number of bytes recovered from the text.
    pub byte_len: usize,
    pub slave_id: Option<u8>,
    pub function_code: Option<u8>,
    pub exception: bool,
    pub exception_code: Option<u8>,
    pub exception_name: Option<&'static str>,
    /// Payload bytes as hex; empty when none could be located.
    pub data_bytes: String,
    pub crc: Option<u16>,
    pub crc_valid: Option<bool>,
    pub problem: Option<String>,
}

/// Parses as much of `text` as possible.
pub fn inspect(text: &str) -> FrameDiagnostic {
    let (bytes, problem) = salvage_bytes(text);
    let mut diag = FrameDiagnostic {
        byte_len: bytes.len(),
        slave_id: bytes.first().copied(),
        function_code: bytes.get(1).copied(),
        problem,
        ..FrameDiagnostic::default()
    };

    let data = if bytes.len() >= MIN_FRAME_LEN {
        let crc_at = bytes.len() - 2;
        let crc = u16::from_le_bytes([bytes[crc_at], bytes[crc_at + 1]]);
        diag.crc = Some(crc);
        diag.crc_valid = Some(crc16(&bytes[..crc_at]) == crc);
        &bytes[2..crc_at]
    } else {
        if diag.problem.is_none() {
            diag.problem = Some(format!(
                "{} bytes is shorter than the {MIN_FRAME_LEN}-byte minimum",
                bytes.len()
            ));
        }
        bytes.get(2..).unwrap_or(&[])
    };
    diag.data_bytes = encode_hex(data);

    if let Some(function) = diag.function_code {
        if function & EXCEPTION_FLAG != 0 {
            diag.exception = true;
            diag.exception_code = data.first().copied();
            diag.exception_name = diag
                .exception_code
                .and_then(ExceptionCode::from_u8)
                .map(ExceptionCode::name);
        }
    }
    diag
}

/// Decodes hex digit pairs until the first bad digit or a dangling nibble.
fn salvage_bytes(text: &str) -> (Vec<u8>, Option<String>) {
    let digits: Vec<char> = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let mut bytes = Vec::with_capacity(digits.len() / 2);
    for (pair_idx, pair) in digits.chunks(2).enumerate() {
        let index = pair_idx * 2;
        if pair.len() < 2 {
            return (
                bytes,
                Some(format!("odd number of hex digits ({})", digits.len())),
            );
        }
        match (pair[0].to_digit(16), pair[1].to_digit(16)) {
            (Some(hi), Some(lo)) => bytes.push((hi * 16 + lo) as u8),
            (None, _) => return (bytes, Some(bad_digit(pair[0], index))),
            (_, None) => return (bytes, Some(bad_digit(pair[1], index + 1))),
        }
    }
    (bytes, None)
}

fn bad_digit(ch: char, index: usize) -> String {
    format!("invalid hex character {ch:?} at digit {index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_reports_everything_unknown() {
        let diag = inspect("");
        assert_eq!(diag.byte_len, 0);
        assert_eq!(diag.slave_id, None);
        assert_eq!(diag.function_code, None);
        assert_eq!(diag.crc, None);
        assert!(diag.problem.is_some());
    }

    #[test]
    fn garbage_tail_keeps_leading_bytes() {
        let diag = inspect("0103zz");
        assert_eq!(diag.slave_id, Some(1));
        assert_eq!(diag.function_code, Some(3));
        assert_eq!(diag.crc, None);
        assert_eq!(
            diag.problem.as_deref(),
            Some("invalid hex character 'z' at digit 4")
        );
    }

    #[test]
    fn dangling_nibble_is_reported() {
        let diag = inspect("01830");
        assert_eq!(diag.byte_len, 2);
        assert!(diag.exception);
        assert_eq!(diag.exception_code, None);
        assert!(diag.problem.unwrap().starts_with("odd number"));
    }
}
