//! Per-device pending fault slots.
//!
//! Each device owns a single coalescing slot: arming a device that is already
//! armed replaces the previous fault and reports it, the way a mailbox
//! coalesces unread writes. Taking a fault is an atomic read-and-clear, so of
//! two racing transactions exactly one observes it.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

use parking_lot::Mutex;

use crate::device::DeviceId;
use crate::fault::FaultDescriptor;

const SHARD_COUNT: usize = 16;

type Shard = Mutex<HashMap<DeviceId, FaultDescriptor>>;

/// Device → armed fault map, sharded by device so unrelated devices do not
/// contend on one lock.
pub struct PendingFaults {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl PendingFaults {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, device: &DeviceId) -> &Shard {
        let idx = self.hasher.hash_one(device) as usize % self.shards.len();
        &self.shards[idx]
    }

    /// Arms `device`, returning the fault it replaced.
    pub fn set_pending(
        &self,
        device: DeviceId,
        descriptor: FaultDescriptor,
    ) -> Option<FaultDescriptor> {
        self.shard(&device).lock().insert(device, descriptor)
    }

    /// Removes and returns the armed fault, if any.
    pub fn take_pending(&self, device: &DeviceId) -> Option<FaultDescriptor> {
        self.shard(device).lock().remove(device)
    }

    /// Reads the armed fault without consuming it.
    pub fn peek_pending(&self, device: &DeviceId) -> Option<FaultDescriptor> {
        self.shard(device).lock().get(device).copied()
    }

    /// All armed faults, ordered by device id.
    ///
    /// Shards are visited one at a time, so the result is consistent per
    /// device but not a global point-in-time view.
    pub fn snapshot(&self) -> Vec<(DeviceId, FaultDescriptor)> {
        let mut out: Vec<_> = self
            .shards
            .iter()
            .flat_map(|shard| {
                shard
                    .lock()
                    .iter()
                    .map(|(device, descriptor)| (device.clone(), *descriptor))
                    .collect::<Vec<_>>()
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Disarms every device, returning how many were armed.
    pub fn clear(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                let mut guard = shard.lock();
                let n = guard.len();
                guard.clear();
                n
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingFaults {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Fault;
    use modbus_frame::ExceptionCode;

    fn device(name: &str) -> DeviceId {
        DeviceId::parse(name).unwrap()
    }

    fn fault(fault: Fault) -> FaultDescriptor {
        FaultDescriptor::new(1, 3, fault).unwrap()
    }

    #[test]
    fn set_then_take_returns_once() {
        let slots = PendingFaults::new();
        let d = fault(Fault::Corrupt);
        assert_eq!(slots.set_pending(device("a"), d), None);
        assert_eq!(slots.take_pending(&device("a")), Some(d));
        assert_eq!(slots.take_pending(&device("a")), None);
    }

    #[test]
    fn last_write_wins_and_reports_replacement() {
        let slots = PendingFaults::new();
        let first = fault(Fault::CrcError);
        let second = fault(Fault::Exception(ExceptionCode::SlaveDeviceBusy));
        assert_eq!(slots.set_pending(device("a"), first), None);
        assert_eq!(slots.set_pending(device("a"), second), Some(first));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots.take_pending(&device("a")), Some(second));
    }

    #[test]
    fn peek_does_not_consume() {
        let slots = PendingFaults::new();
        let d = fault(Fault::PacketDrop);
        slots.set_pending(device("a"), d);
        assert_eq!(slots.peek_pending(&device("a")), Some(d));
        assert_eq!(slots.peek_pending(&device("a")), Some(d));
        assert_eq!(slots.peek_pending(&device("b")), None);
    }

    #[test]
    fn snapshot_is_sorted_and_clear_empties() {
        let slots = PendingFaults::new();
        for name in ["c", "a", "b"] {
            slots.set_pending(device(name), fault(Fault::Corrupt));
        }
        let names: Vec<_> = slots
            .snapshot()
            .into_iter()
            .map(|(id, _)| id.to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(slots.clear(), 3);
        assert!(slots.is_empty());
    }
}
