//! CRC-16/Modbus.

const INIT: u16 = 0xFFFF;
/// Reflected form of the 0x8005 polynomial.
const POLY: u16 = 0xA001;

/// Computes the CRC-16/Modbus checksum of `bytes`.
///
/// The result is transmitted little-endian at the end of a frame.
#[inline]
pub fn crc16(bytes: &[u8]) -> u16 {
    let mut crc = INIT;
    for &byte in bytes {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
