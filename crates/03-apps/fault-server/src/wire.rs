//! JSON bodies of the HTTP surface.
//!
//! Request bodies reject unknown keys. Numeric fault parameters are read as
//! wide integers and range-checked by the harness, so an out-of-range value
//! is an `invalid_parameter` error rather than a decoding failure.

use serde::{Deserialize, Serialize};

use fault_harness::{DeviceId, FaultDescriptor, FaultRequest, HistorySnapshot};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddFlagBody {
    #[serde(rename = "device_id")]
    pub device_id: String,
    pub error_type: String,
    pub exception_code: Option<i64>,
    pub delay_ms: Option<i64>,
    pub slave_address: Option<i64>,
    pub function_code: Option<i64>,
}

impl AddFlagBody {
    pub fn fault_request(&self) -> FaultRequest {
        FaultRequest {
            error_type: self.error_type.clone(),
            slave_address: self.slave_address,
            function_code: self.function_code,
            exception_code: self.exception_code,
            delay_ms: self.delay_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EmulateBody {
    pub slave_address: i64,
    pub function_code: i64,
    pub error_type: String,
    pub exception_code: Option<i64>,
    pub delay_ms: Option<i64>,
    /// Record the emulation against this device.
    #[serde(rename = "device_id")]
    pub device_id: Option<String>,
}

impl EmulateBody {
    pub fn fault_request(&self) -> FaultRequest {
        FaultRequest {
            error_type: self.error_type.clone(),
            slave_address: Some(self.slave_address),
            function_code: Some(self.function_code),
            exception_code: self.exception_code,
            delay_ms: self.delay_ms,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionBody {
    pub device_id: String,
    /// Hex of the well-formed response the simulator would send.
    pub frame: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InspectBody {
    pub frame: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    /// Only the most recent `limit` records.
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AddFlagResponse {
    pub message: String,
    pub replaced: bool,
    pub device_id: DeviceId,
    pub descriptor: FaultDescriptor,
    pub previous: Option<FaultDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct PendingEntry {
    pub device_id: DeviceId,
    #[serde(flatten)]
    pub descriptor: FaultDescriptor,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub history: HistorySnapshot,
    pub count: usize,
    pub capacity: usize,
    pub pending: Vec<PendingEntry>,
}

#[derive(Debug, Serialize)]
pub struct DeviceStatusResponse {
    pub device_id: DeviceId,
    pub history: HistorySnapshot,
    pub count: usize,
    pub pending: Option<FaultDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub device_id: DeviceId,
    pub pending: Option<FaultDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub cleared: usize,
    pub disarmed: bool,
}

#[derive(Debug, Serialize)]
pub struct ClearAllResponse {
    pub message: String,
    pub cleared: usize,
    /// Number of devices whose armed fault was dropped.
    pub disarmed: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmulateResponse {
    /// Hex frame, or `null` when the fault drops the response.
    pub frame: Option<String>,
    pub no_response: bool,
    pub delay_ms: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub frame: Option<String>,
    pub no_response: bool,
    pub fault: Option<FaultDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
