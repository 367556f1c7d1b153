//! Modbus RTU-style response frames for the fault harness.
//!
//! This crate is a pure value layer: it builds, encodes, decodes and perturbs
//! frames of the form `[slave][function][payload...][crc lo][crc hi]` and has
//! no notion of devices, queues or transport.

#![allow(missing_docs)]

mod codec;
mod crc;
mod error;
mod exception;
mod frame;
pub mod inspect;

pub use codec::{decode_hex, encode_hex};
pub use crc::crc16;
pub use error::{FrameError, FrameResult};
pub use exception::ExceptionCode;
pub use frame::{Frame, CORRUPTION_MASK, EXCEPTION_FLAG, MIN_FRAME_LEN};
pub use inspect::{inspect, FrameDiagnostic};
