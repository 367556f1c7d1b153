//! The process-scoped harness: pending slots, ledger and both injection paths.

use std::num::NonZeroUsize;

use tracing::{debug, info, warn};

use modbus_frame::Frame;

use crate::device::DeviceId;
use crate::emulate::{emulate, EmulationOutcome};
use crate::error::HarnessResult;
use crate::fault::{FaultDescriptor, FaultRequest};
use crate::ledger::{unix_millis, Dispatch, Ledger, Origin};
use crate::link::DeviceLink;
use crate::pending::PendingFaults;

/// Ledger retention when nothing else is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HarnessConfig {
    pub history_capacity: NonZeroUsize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            history_capacity: NonZeroUsize::new(DEFAULT_HISTORY_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// Result of arming a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Armed {
    pub descriptor: FaultDescriptor,
    /// The fault this one displaced, if the device was already armed.
    pub replaced: Option<FaultDescriptor>,
}

/// Result of clearing one device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cleared {
    pub records: usize,
    pub disarmed: Option<FaultDescriptor>,
}

/// Result of clearing every device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearedAll {
    pub records: usize,
    pub disarmed: usize,
}

/// What a device transaction ended up sending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// The pending fault this transaction consumed.
    pub fault: Option<FaultDescriptor>,
    /// Frame delivered to the device; `None` when the response was dropped.
    pub response: Option<Frame>,
    pub status_code: u16,
}

pub struct Harness {
    pending: PendingFaults,
    ledger: Ledger,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            pending: PendingFaults::new(),
            ledger: Ledger::with_capacity(config.history_capacity),
        }
    }

    pub fn pending(&self) -> &PendingFaults {
        &self.pending
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Validates `request` and arms it for the device's next transaction.
    pub fn arm(&self, device: DeviceId, request: &FaultRequest) -> HarnessResult<Armed> {
        let descriptor = FaultDescriptor::from_request(request)?;
        let replaced = self.pending.set_pending(device.clone(), descriptor);
        match replaced {
            Some(previous) => warn!(%device, %descriptor, %previous, "replaced armed fault"),
            None => info!(%device, %descriptor, "armed fault"),
        }
        Ok(Armed {
            descriptor,
            replaced,
        })
    }

    /// Drops the device's history and disarms it.
    pub fn clear_device(&self, device: &DeviceId) -> Cleared {
        let records = self.ledger.clear_device(device);
        let disarmed = self.pending.take_pending(device);
        info!(%device, records, disarmed = disarmed.is_some(), "cleared device");
        Cleared { records, disarmed }
    }

    /// Empties the ledger and disarms every device.
    pub fn clear_all(&self) -> ClearedAll {
        let records = self.ledger.clear_all();
        let disarmed = self.pending.clear();
        info!(records, disarmed, "cleared all devices");
        ClearedAll { records, disarmed }
    }

    /// Immediate path: synthesizes the fault frame and waits out any delay.
    ///
    /// Touches no pending slot. With `record_for` set, an `IMMEDIATE` record
    /// is appended once the outcome is ready.
    pub async fn emulate_now(
        &self,
        request: &FaultRequest,
        record_for: Option<DeviceId>,
    ) -> HarnessResult<EmulationOutcome> {
        let descriptor = FaultDescriptor::from_request(request)?;
        let dispatched_at = unix_millis();
        let outcome = emulate(&descriptor);
        debug!(%descriptor, frame = ?outcome.frame().map(Frame::to_hex), "emulated");

        let delay = outcome.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(device) = record_for {
            let status = match outcome.frame() {
                Some(_) => 200,
                None => 204,
            };
            self.ledger.append(
                device,
                descriptor,
                Origin::Immediate,
                dispatched_at,
                Dispatch::ok(status),
            );
        }
        Ok(outcome)
    }

    /// Serves one real transaction for `device`.
    ///
    /// `base` is the well-formed response the device would normally get. If
    /// a fault is armed it is consumed, applied and recorded with the link's
    /// actual outcome; a failed dispatch still consumes the slot.
    pub async fn serve_transaction(
        &self,
        device: &DeviceId,
        base: Frame,
        link: &dyn DeviceLink,
    ) -> HarnessResult<TransactionOutcome> {
        base.verify_crc()?;

        let Some(descriptor) = self.pending.take_pending(device) else {
            let status_code = link.deliver(device, Some(&base)).await?;
            return Ok(TransactionOutcome {
                fault: None,
                response: Some(base),
                status_code,
            });
        };

        info!(%device, %descriptor, "applying armed fault");
        let dispatched_at = unix_millis();
        let outcome = descriptor.apply(base);
        let delay = outcome.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let response = outcome.into_frame();

        match link.deliver(device, response.as_ref()).await {
            Ok(status_code) => {
                self.ledger.append(
                    device.clone(),
                    descriptor,
                    Origin::Queued,
                    dispatched_at,
                    Dispatch::ok(status_code),
                );
                Ok(TransactionOutcome {
                    fault: Some(descriptor),
                    response,
                    status_code,
                })
            }
            Err(err) => {
                warn!(%device, %descriptor, error = %err, "fault dispatch failed");
                self.ledger.append(
                    device.clone(),
                    descriptor,
                    Origin::Queued,
                    dispatched_at,
                    Dispatch::failed(err.status_code),
                );
                Err(err.into())
            }
        }
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}
