use thiserror::Error;

pub type FrameResult<T> = Result<T, FrameError>;

/// Reasons a hex string or frame is unusable.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("malformed frame: odd number of hex digits ({digits})")]
    OddLength { digits: usize },

    #[error("malformed frame: invalid hex character {ch:?} at digit {index}")]
    InvalidHex { ch: char, index: usize },

    #[error("malformed frame: {len} bytes is shorter than the {minimum}-byte minimum")]
    TooShort { len: usize, minimum: usize },

    #[error("malformed frame: CRC {received:04X} does not match computed {expected:04X}")]
    CrcMismatch { expected: u16, received: u16 },
}
