//! Single-flight semantics of pending fault slots under contention.

use std::sync::{Arc, Barrier};
use std::thread;

use fault_harness::{DeviceId, Fault, FaultDescriptor, PendingFaults};
use proptest::collection;
use proptest::prelude::*;

fn device(name: &str) -> DeviceId {
    DeviceId::parse(name).expect("device id")
}

fn corrupt() -> FaultDescriptor {
    FaultDescriptor::new(1, 3, Fault::Corrupt).expect("descriptor")
}

/// Racing takers on one device: exactly one observes the armed fault, every round.
#[test]
fn racing_takes_observe_the_fault_once() {
    const TAKERS: usize = 8;
    const ROUNDS: usize = 200;

    let slots = Arc::new(PendingFaults::new());
    let target = device("EcoWatt001");

    for round in 0..ROUNDS {
        slots.set_pending(target.clone(), corrupt());
        let barrier = Arc::new(Barrier::new(TAKERS));
        let handles: Vec<_> = (0..TAKERS)
            .map(|_| {
                let slots = Arc::clone(&slots);
                let barrier = Arc::clone(&barrier);
                let target = target.clone();
                thread::spawn(move || {
                    barrier.wait();
                    slots.take_pending(&target).is_some()
                })
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("taker thread"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1, "round {round}");
    }
}

/// Arming one device never disturbs another device's slot.
#[test]
fn devices_are_independent() {
    let slots = PendingFaults::new();
    let a = device("a");
    let b = device("b");
    slots.set_pending(a.clone(), corrupt());
    assert_eq!(slots.take_pending(&b), None);
    assert_eq!(slots.take_pending(&a), Some(corrupt()));
}

#[derive(Clone, Debug)]
enum Op {
    Set(u32),
    Take,
}

proptest! {
    /// Random set/take sequences uphold last-write-wins at every take.
    #[test]
    fn last_write_wins(seq in collection::vec(0u32..60_001, 1..120)) {
        let slots = PendingFaults::new();
        let target = device("dev");
        let ops: Vec<Op> = seq
            .into_iter()
            .flat_map(|x| if x % 3 == 0 { vec![Op::Set(x), Op::Take] } else { vec![Op::Set(x)] })
            .collect();

        let mut expected: Option<FaultDescriptor> = None;
        for op in ops {
            match op {
                Op::Set(millis) => {
                    let d = FaultDescriptor::new(1, 3, Fault::Delay { millis }).unwrap();
                    let previous = slots.set_pending(target.clone(), d);
                    prop_assert_eq!(previous, expected);
                    expected = Some(d);
                }
                Op::Take => {
                    prop_assert_eq!(slots.take_pending(&target), expected.take());
                    prop_assert_eq!(slots.take_pending(&target), None);
                }
            }
        }
    }
}
