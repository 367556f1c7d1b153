//! Frame value type and the corruption primitives used to build fault frames.
//!
//! # Layout
//! - Byte 0: slave address
//! - Byte 1: function code (bit 7 set for exception responses)
//! - Bytes 2..n-2: payload
//! - Bytes n-2..n: CRC-16/Modbus over bytes 0..n-2 (little-endian)

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{decode_hex, encode_hex};
use crate::crc::crc16;
use crate::error::{FrameError, FrameResult};
use crate::exception::ExceptionCode;

/// Smallest decodable frame: slave + function + two CRC bytes.
pub const MIN_FRAME_LEN: usize = 4;

/// Bit set on the function code of an exception response.
pub const EXCEPTION_FLAG: u8 = 0x80;

/// Pattern XORed into payload bytes by [`Frame::with_corrupted_payload`].
pub const CORRUPTION_MASK: u8 = 0xA5;

/// A single response frame.
///
/// The `crc` field holds whatever trailer the frame carries, which is not
/// necessarily the correct checksum; see [`Frame::crc_is_valid`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    slave_address: u8,
    function_code: u8,
    payload: Vec<u8>,
    crc: u16,
}

impl Frame {
    /// Builds a well-formed frame with a correct CRC.
    pub fn new(slave_address: u8, function_code: u8, payload: impl Into<Vec<u8>>) -> Self {
        let mut frame = Self {
            slave_address,
            function_code,
            payload: payload.into(),
            crc: 0,
        };
        frame.crc = frame.computed_crc();
        frame
    }

    /// Builds a well-formed exception response for `function_code`.
    pub fn exception(slave_address: u8, function_code: u8, code: ExceptionCode) -> Self {
        Self::new(
            slave_address,
            function_code | EXCEPTION_FLAG,
            vec![code.as_u8()],
        )
    }

    /// Canonical successful response for a request, used when no real device
    /// reply is available to perturb.
    pub fn nominal_response(slave_address: u8, function_code: u8) -> Self {
        let payload: &[u8] = match function_code {
            // byte count, one status byte
            0x01 | 0x02 => &[0x01, 0x01],
            // byte count, one register (2500)
            0x03 | 0x04 => &[0x02, 0x09, 0xC4],
            0x05 => &[0x00, 0x00, 0xFF, 0x00],
            0x06 => &[0x00, 0x00, 0x09, 0xC4],
            // start address, quantity written
            0x0F | 0x10 => &[0x00, 0x00, 0x00, 0x01],
            _ => &[0x00],
        };
        Self::new(slave_address, function_code, payload)
    }

    #[inline]
    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    #[inline]
    pub fn function_code(&self) -> u8 {
        self.function_code
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// CRC trailer as carried by the frame.
    #[inline]
    pub fn crc(&self) -> u16 {
        self.crc
    }

    /// CRC the frame should carry given its current bytes.
    pub fn computed_crc(&self) -> u16 {
        crc16(&self.body())
    }

    pub fn crc_is_valid(&self) -> bool {
        self.crc == self.computed_crc()
    }

    /// Like [`crc_is_valid`](Self::crc_is_valid), with both values in the error.
    pub fn verify_crc(&self) -> FrameResult<()> {
        let expected = self.computed_crc();
        if self.crc == expected {
            Ok(())
        } else {
            Err(FrameError::CrcMismatch {
                expected,
                received: self.crc,
            })
        }
    }

    #[inline]
    pub fn is_exception(&self) -> bool {
        self.function_code & EXCEPTION_FLAG != 0
    }

    /// Raw exception code byte of an exception response.
    pub fn exception_code(&self) -> Option<u8> {
        if self.is_exception() {
            self.payload.first().copied()
        } else {
            None
        }
    }

    /// Turns this frame into an internally consistent exception response.
    pub fn into_exception(self, code: ExceptionCode) -> Self {
        Self::exception(self.slave_address, self.function_code, code)
    }

    /// Keeps every byte but replaces the trailer with the complement of the
    /// correct CRC.
    pub fn with_inverted_crc(mut self) -> Self {
        self.crc = !self.computed_crc();
        self
    }

    /// XORs every payload byte with [`CORRUPTION_MASK`] and re-seals the CRC,
    /// so only semantic validation on the receiver can notice.
    ///
    /// An empty payload becomes the single byte `CORRUPTION_MASK`.
    pub fn with_corrupted_payload(mut self) -> Self {
        if self.payload.is_empty() {
            self.payload.push(CORRUPTION_MASK);
        } else {
            for byte in &mut self.payload {
                *byte ^= CORRUPTION_MASK;
            }
        }
        self.crc = self.computed_crc();
        self
    }

    /// Wire bytes in transmission order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.body();
        out.extend_from_slice(&self.crc.to_le_bytes());
        out
    }

    pub fn to_hex(&self) -> String {
        encode_hex(&self.to_bytes())
    }

    /// Splits raw wire bytes into a frame without checking the CRC.
    pub fn from_bytes(bytes: &[u8]) -> FrameResult<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort {
                len: bytes.len(),
                minimum: MIN_FRAME_LEN,
            });
        }
        let crc_at = bytes.len() - 2;
        Ok(Self {
            slave_address: bytes[0],
            function_code: bytes[1],
            payload: bytes[2..crc_at].to_vec(),
            crc: u16::from_le_bytes([bytes[crc_at], bytes[crc_at + 1]]),
        })
    }

    pub fn from_hex(text: &str) -> FrameResult<Self> {
        Self::from_bytes(&decode_hex(text)?)
    }

    fn body(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.payload.len() + 2);
        out.push(self.slave_address);
        out.push(self.function_code);
        out.extend_from_slice(&self.payload);
        out
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Frame {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Frame {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Frame::from_hex(&text).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_frame_carries_correct_crc() {
        let frame = Frame::new(0x01, 0x03, [0x02, 0x09, 0xC4]);
        assert_eq!(frame.crc(), 0x87BF);
        assert!(frame.crc_is_valid());
        assert_eq!(frame.to_hex(), "01030209C4BF87");
    }

    #[test]
    fn exception_sets_high_bit_and_single_byte_payload() {
        let frame = Frame::exception(1, 3, ExceptionCode::SlaveDeviceFailure);
        assert_eq!(frame.function_code(), 0x83);
        assert_eq!(frame.payload(), &[0x04]);
        assert_eq!(frame.to_hex(), "01830440F3");
        assert_eq!(frame.exception_code(), Some(4));
    }

    #[test]
    fn inverted_crc_keeps_body() {
        let base = Frame::nominal_response(1, 3);
        let bad = base.clone().with_inverted_crc();
        assert_eq!(bad.slave_address(), base.slave_address());
        assert_eq!(bad.function_code(), base.function_code());
        assert_eq!(bad.payload(), base.payload());
        assert_eq!(bad.crc(), !base.crc());
        assert!(!bad.crc_is_valid());
    }

    #[test]
    fn corrupted_payload_is_resealed() {
        let frame = Frame::nominal_response(1, 3).with_corrupted_payload();
        assert_eq!(frame.payload(), &[0xA7, 0xAC, 0x61]);
        assert!(frame.crc_is_valid());
        assert_eq!(frame.to_hex(), "0103A7AC61148F");
    }

    #[test]
    fn corrupting_an_empty_payload_injects_a_byte() {
        let frame = Frame::new(1, 0x2B, Vec::new()).with_corrupted_payload();
        assert_eq!(frame.payload(), &[CORRUPTION_MASK]);
        assert!(frame.crc_is_valid());
    }

    #[test]
    fn decode_rejects_short_input() {
        assert_eq!(
            Frame::from_hex("018304"),
            Err(FrameError::TooShort { len: 3, minimum: 4 })
        );
    }

    #[test]
    fn decode_keeps_wrong_crc_as_read() {
        let frame = Frame::from_hex("01030209C44078").unwrap();
        assert_eq!(frame.crc(), 0x7840);
        assert!(!frame.crc_is_valid());
        assert_eq!(
            frame.verify_crc(),
            Err(FrameError::CrcMismatch {
                expected: 0x87BF,
                received: 0x7840
            })
        );
        assert_eq!(Frame::nominal_response(1, 3).verify_crc(), Ok(()));
    }

    #[test]
    fn nominal_responses_never_have_empty_payloads() {
        for function in 0u8..0x80 {
            assert!(!Frame::nominal_response(1, function).payload().is_empty());
        }
    }
}
