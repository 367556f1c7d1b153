//! Fault injection core: fault taxonomy, per-device pending faults, the
//! injection ledger and immediate emulation.
//!
//! Everything process-wide lives in a [`Harness`] value owned by whoever
//! embeds it (the HTTP server in practice). Nothing here is global.

#![allow(missing_docs)]

mod device;
mod emulate;
mod error;
mod fault;
mod harness;
mod ledger;
mod link;
mod pending;

pub use device::DeviceId;
pub use emulate::{emulate, EmulationOutcome};
pub use error::{DispatchError, HarnessError, HarnessResult};
pub use fault::{
    Fault, FaultDescriptor, FaultKind, FaultRequest, DEFAULT_FUNCTION_CODE,
    DEFAULT_SLAVE_ADDRESS, MAX_DELAY_MS, MAX_SLAVE_ADDRESS,
};
pub use harness::{
    Armed, Cleared, ClearedAll, Harness, HarnessConfig, TransactionOutcome, DEFAULT_HISTORY_CAPACITY,
};
pub use ledger::{
    unix_millis, Dispatch, DispatchStatus, HistorySnapshot, InjectionRecord, Ledger, Origin,
};
pub use link::{DeviceLink, DispatchFuture, LoopbackLink};
pub use pending::PendingFaults;

pub use modbus_frame::{ExceptionCode, Frame};
