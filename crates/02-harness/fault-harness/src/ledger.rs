//! Injection history.
//!
//! Records are immutable once appended and shared as `Arc`s, so listing is a
//! cheap copy of pointers taken under a read lock. Retention is a ring: once
//! `capacity` records are held, each append evicts the oldest one.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;
use serde::{Serialize, Serializer};

use crate::device::DeviceId;
use crate::fault::FaultDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    SentOk,
    SentFailed,
}

/// Which path produced an injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Origin {
    /// Armed on the queue and consumed by a device transaction.
    Queued,
    /// Synthesized on request by the emulation endpoint.
    Immediate,
}

/// Outcome of handing a response to the device side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub status: DispatchStatus,
    pub simulator_status_code: Option<u16>,
}

impl Dispatch {
    pub fn ok(status_code: u16) -> Self {
        Self {
            status: DispatchStatus::SentOk,
            simulator_status_code: Some(status_code),
        }
    }

    pub fn failed(status_code: Option<u16>) -> Self {
        Self {
            status: DispatchStatus::SentFailed,
            simulator_status_code: status_code,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InjectionRecord {
    /// Position in the ledger; strictly increasing, never reused.
    pub seq: u64,
    #[serde(rename = "device_id")]
    pub device_id: DeviceId,
    #[serde(flatten)]
    pub descriptor: FaultDescriptor,
    /// When the injection was dispatched, in milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub dispatch_status: DispatchStatus,
    pub simulator_status_code: Option<u16>,
    pub origin: Origin,
}

struct LedgerInner {
    records: VecDeque<Arc<InjectionRecord>>,
    next_seq: u64,
}

pub struct Ledger {
    inner: RwLock<LedgerInner>,
    capacity: NonZeroUsize,
}

impl Ledger {
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            inner: RwLock::new(LedgerInner {
                records: VecDeque::with_capacity(capacity.get()),
                next_seq: 1,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Numbers and stores a record, evicting the oldest one at capacity.
    ///
    /// `timestamp` is taken by the caller when the injection is dispatched,
    /// which for delayed faults is well before the record is appended.
    pub fn append(
        &self,
        device_id: DeviceId,
        descriptor: FaultDescriptor,
        origin: Origin,
        timestamp: u64,
        dispatch: Dispatch,
    ) -> Arc<InjectionRecord> {
        let mut inner = self.inner.write();
        let record = Arc::new(InjectionRecord {
            seq: inner.next_seq,
            device_id,
            descriptor,
            timestamp,
            dispatch_status: dispatch.status,
            simulator_status_code: dispatch.simulator_status_code,
            origin,
        });
        inner.next_seq += 1;
        if inner.records.len() == self.capacity.get() {
            inner.records.pop_front();
        }
        inner.records.push_back(Arc::clone(&record));
        record
    }

    pub fn list_all(&self) -> HistorySnapshot {
        let inner = self.inner.read();
        HistorySnapshot {
            records: inner.records.iter().cloned().collect(),
        }
    }

    /// Records for one device; empty for devices never seen.
    pub fn list_for_device(&self, device: &DeviceId) -> HistorySnapshot {
        let inner = self.inner.read();
        HistorySnapshot {
            records: inner
                .records
                .iter()
                .filter(|record| &record.device_id == device)
                .cloned()
                .collect(),
        }
    }

    /// Drops every record for `device`, returning how many went.
    pub fn clear_device(&self, device: &DeviceId) -> usize {
        let mut inner = self.inner.write();
        let before = inner.records.len();
        inner.records.retain(|record| &record.device_id != device);
        before - inner.records.len()
    }

    pub fn clear_all(&self) -> usize {
        let mut inner = self.inner.write();
        let n = inner.records.len();
        inner.records.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Point-in-time copy of ledger contents, oldest first.
///
/// Iterating does not touch the ledger, and can be repeated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    records: Vec<Arc<InjectionRecord>>,
}

impl HistorySnapshot {
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &InjectionRecord> + ExactSizeIterator {
        self.records.iter().map(Arc::as_ref)
    }

    /// Most recent first.
    pub fn newest_first(&self) -> impl Iterator<Item = &InjectionRecord> {
        self.iter().rev()
    }

    /// Keeps only the `n` most recent records, still oldest first.
    pub fn latest(mut self, n: usize) -> Self {
        let skip = self.records.len().saturating_sub(n);
        self.records.drain(..skip);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for HistorySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Fault;

    fn device(name: &str) -> DeviceId {
        DeviceId::parse(name).unwrap()
    }

    fn ledger(capacity: usize) -> Ledger {
        Ledger::with_capacity(NonZeroUsize::new(capacity).unwrap())
    }

    fn push(ledger: &Ledger, name: &str) -> Arc<InjectionRecord> {
        let descriptor = FaultDescriptor::new(1, 3, Fault::Corrupt).unwrap();
        ledger.append(
            device(name),
            descriptor,
            Origin::Queued,
            unix_millis(),
            Dispatch::ok(200),
        )
    }

    #[test]
    fn preserves_insertion_order() {
        let ledger = ledger(8);
        for name in ["a", "b", "a", "c"] {
            push(&ledger, name);
        }
        let seqs: Vec<u64> = ledger.list_all().iter().map(|r| r.seq).collect();
        assert_eq!(seqs, [1, 2, 3, 4]);
        let newest: Vec<u64> = ledger.list_all().newest_first().map(|r| r.seq).collect();
        assert_eq!(newest, [4, 3, 2, 1]);
    }

    #[test]
    fn ring_evicts_oldest() {
        let ledger = ledger(2);
        push(&ledger, "a");
        push(&ledger, "b");
        push(&ledger, "c");
        let devices: Vec<String> = ledger
            .list_all()
            .iter()
            .map(|r| r.device_id.to_string())
            .collect();
        assert_eq!(devices, ["b", "c"]);
        assert_eq!(ledger.list_all().iter().next().map(|r| r.seq), Some(2));
    }

    #[test]
    fn clear_device_leaves_other_devices() {
        let ledger = ledger(8);
        for name in ["a", "b", "a", "c"] {
            push(&ledger, name);
        }
        assert_eq!(ledger.clear_device(&device("a")), 2);
        assert!(ledger.list_for_device(&device("a")).is_empty());
        assert_eq!(ledger.list_for_device(&device("b")).len(), 1);
        assert_eq!(ledger.list_for_device(&device("c")).len(), 1);
        assert_eq!(ledger.clear_all(), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let ledger = ledger(8);
        push(&ledger, "a");
        let snapshot = ledger.list_all();
        push(&ledger, "a");
        ledger.clear_all();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.iter().count(), 1);
        assert_eq!(snapshot.iter().count(), 1);
    }

    #[test]
    fn latest_keeps_the_tail() {
        let ledger = ledger(8);
        for name in ["a", "b", "c", "d"] {
            push(&ledger, name);
        }
        let seqs: Vec<u64> = ledger.list_all().latest(2).iter().map(|r| r.seq).collect();
        assert_eq!(seqs, [3, 4]);
        assert_eq!(ledger.list_all().latest(10).len(), 4);
    }

    #[test]
    fn record_json_is_flat() {
        let ledger = ledger(1);
        let record = push(&ledger, "EcoWatt001");
        let json = serde_json::to_value(record.as_ref()).unwrap();
        assert_eq!(json["device_id"], "EcoWatt001");
        assert_eq!(json["errorType"], "CORRUPT");
        assert_eq!(json["exceptionCode"], 0);
        assert_eq!(json["dispatchStatus"], "SENT_OK");
        assert_eq!(json["simulatorStatusCode"], 200);
        assert_eq!(json["origin"], "QUEUED");
        assert_eq!(json["timestamp"], record.timestamp);
        assert!(json.get("timestampMs").is_none());
    }
}
