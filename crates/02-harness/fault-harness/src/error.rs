use thiserror::Error;

use modbus_frame::FrameError;

pub type HarnessResult<T> = Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl HarnessError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        HarnessError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            HarnessError::InvalidParameter { .. } => "invalid_parameter",
            HarnessError::Frame(_) => "malformed_frame",
            HarnessError::Dispatch(_) => "dispatch_failure",
        }
    }
}

/// The link that should have carried a response to the device gave up.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("dispatch failed: {reason}")]
pub struct DispatchError {
    /// Status reported by the far side, when it answered at all.
    pub status_code: Option<u16>,
    pub reason: String,
}

impl DispatchError {
    pub fn new(status_code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            status_code,
            reason: reason.into(),
        }
    }
}
