use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::{HarnessError, HarnessResult};

const MAX_DEVICE_ID_LEN: usize = 64;

/// Identifier of a field device, e.g. `EcoWatt001`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(Arc<str>);

impl DeviceId {
    pub fn parse(raw: &str) -> HarnessResult<Self> {
        if raw.trim().is_empty() {
            return Err(HarnessError::invalid("device_id", "must not be empty"));
        }
        if raw.len() > MAX_DEVICE_ID_LEN {
            return Err(HarnessError::invalid(
                "device_id",
                format!("longer than {MAX_DEVICE_ID_LEN} bytes"),
            ));
        }
        if raw.chars().any(char::is_control) {
            return Err(HarnessError::invalid(
                "device_id",
                "contains control characters",
            ));
        }
        Ok(Self(Arc::from(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
