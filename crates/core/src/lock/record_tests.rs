// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::FakeClock;

fn holder(n: u32) -> HolderId {
    HolderId::new(format!("holder-{}", n))
}

fn acquire(n: u32) -> LockInput {
    LockInput::Acquire {
        holder: holder(n),
        notify: Address::new(format!("reply-{}", n)),
    }
}

fn release(n: u32) -> LockInput {
    LockInput::Release { holder: holder(n) }
}

fn destroy(n: u32) -> LockInput {
    LockInput::Destroy { holder: holder(n) }
}

fn request(op: LockOp, n: u32) -> LockRequest {
    LockRequest::new(op, "mutex.X", holder(n))
}

fn reply_to(n: u32) -> Address {
    Address::new(format!("reply-{}", n))
}

#[test]
fn new_record_is_free() {
    let record = LockRecord::new(LockConfig::new("mutex.X"));
    assert!(record.is_free());
    assert!(record.holder().is_none());
    assert!(record.is_consistent());
}

#[test]
fn acquire_free_lock_grants_immediately() {
    let clock = FakeClock::new();
    let record = LockRecord::new(LockConfig::new("mutex.X"));

    let (record, effects) = record.transition(acquire(1), &clock);

    assert!(record.is_held_by(&holder(1)));
    assert_eq!(effects, vec![LockEffect::Granted { holder: holder(1) }]);
}

#[test]
fn acquire_held_lock_queues_without_reply() {
    let clock = FakeClock::new();
    let record = LockRecord::new(LockConfig::new("mutex.X"));
    let (record, _) = record.transition(acquire(1), &clock);

    let (record, effects) = record.transition(acquire(2), &clock);

    assert!(record.is_held_by(&holder(1)));
    assert_eq!(
        effects,
        vec![LockEffect::Queued {
            holder: holder(2),
            position: 1
        }]
    );
    assert!(record.is_waiting(&holder(2)));
}

#[test]
fn holder_cannot_acquire_twice() {
    let clock = FakeClock::new();
    let (record, _) = LockRecord::new(LockConfig::new("mutex.X")).transition(acquire(1), &clock);

    let (record, effects) = record.transition(acquire(1), &clock);

    assert!(matches!(
        &effects[..],
        [LockEffect::Denied(LockDenial::AlreadyHolder { .. })]
    ));
    assert!(record.waiters.is_empty());
}

#[test]
fn waiter_cannot_queue_twice() {
    let clock = FakeClock::new();
    let (record, _) = LockRecord::new(LockConfig::new("mutex.X")).transition(acquire(1), &clock);
    let (record, _) = record.transition(acquire(2), &clock);

    let (record, effects) = record.transition(acquire(2), &clock);

    assert!(matches!(
        &effects[..],
        [LockEffect::Denied(LockDenial::AlreadyWaiting { .. })]
    ));
    assert_eq!(record.waiters.len(), 1);
}

#[test]
fn full_queue_denies_acquire() {
    let clock = FakeClock::new();
    let config = LockConfig::new("mutex.X").with_max_waiters(Some(1));
    let (record, _) = LockRecord::new(config).transition(acquire(1), &clock);
    let (record, _) = record.transition(acquire(2), &clock);

    let (record, effects) = record.transition(acquire(3), &clock);

    assert_eq!(
        effects,
        vec![LockEffect::Denied(LockDenial::QueueFull {
            lock: "mutex.X".into(),
            limit: 1
        })]
    );
    assert!(!record.is_waiting(&holder(3)));
}

#[test]
fn release_without_waiters_frees_lock() {
    let clock = FakeClock::new();
    let (record, _) = LockRecord::new(LockConfig::new("mutex.X")).transition(acquire(1), &clock);

    let (record, effects) = record.transition(release(1), &clock);

    assert!(record.is_free());
    assert_eq!(effects, vec![LockEffect::Released { holder: holder(1) }]);
}

#[test]
fn release_promotes_head_waiter() {
    let clock = FakeClock::new();
    let (record, _) = LockRecord::new(LockConfig::new("mutex.X")).transition(acquire(1), &clock);
    let (record, _) = record.transition(acquire(2), &clock);
    let (record, _) = record.transition(acquire(3), &clock);

    let (record, effects) = record.transition(release(1), &clock);

    assert!(record.is_held_by(&holder(2)));
    assert_eq!(record.waiters.len(), 1);
    assert!(matches!(
        &effects[..],
        [LockEffect::Released { .. }, LockEffect::Promoted { waiter }]
        if waiter.holder == holder(2) && waiter.notify == reply_to(2)
    ));
}

#[test]
fn release_by_non_holder_is_denied_and_changes_nothing() {
    let clock = FakeClock::new();
    let (record, _) = LockRecord::new(LockConfig::new("mutex.X")).transition(acquire(1), &clock);
    let (record, _) = record.transition(acquire(2), &clock);

    let (next, effects) = record.transition(release(2), &clock);

    assert_eq!(
        effects,
        vec![LockEffect::Denied(LockDenial::NotHolder {
            lock: "mutex.X".into(),
            requester: holder(2)
        })]
    );
    assert_eq!(next.status, record.status);
    assert_eq!(next.waiters, record.waiters);
}

#[test]
fn destroy_held_lock_is_denied() {
    let clock = FakeClock::new();
    let (record, _) = LockRecord::new(LockConfig::new("mutex.X")).transition(acquire(1), &clock);

    let (next, effects) = record.transition(destroy(1), &clock);

    assert!(matches!(
        &effects[..],
        [LockEffect::Denied(LockDenial::Held { holder: h, .. })] if *h == holder(1)
    ));
    assert!(next.is_held_by(&holder(1)));
}

#[test]
fn destroy_free_lock_succeeds() {
    let clock = FakeClock::new();
    let record = LockRecord::new(LockConfig::new("mutex.X"));
    let (_, effects) = record.transition(destroy(1), &clock);
    assert_eq!(effects, vec![LockEffect::Destroyed]);
}

#[test]
fn denials_are_state_violations() {
    let failure: Failure = LockDenial::UnknownLock { lock: "m".into() }.into();
    assert_eq!(failure.kind, crate::message::FailureKind::StateViolation);
    assert_eq!(failure.description, "unknown lock: m");
}

// Table

#[test]
fn table_creates_record_on_first_acquire() {
    let clock = FakeClock::new();
    let mut table = LockTable::new();

    let effects = table.apply(&request(LockOp::Acquire, 1), &reply_to(1), &clock);

    assert_eq!(effects, vec![LockEffect::Granted { holder: holder(1) }]);
    assert_eq!(table.lock_names(), vec!["mutex.X"]);
}

#[test]
fn table_release_of_unknown_lock_is_not_holder() {
    let clock = FakeClock::new();
    let mut table = LockTable::new();

    let effects = table.apply(&request(LockOp::Release, 1), &reply_to(1), &clock);

    assert!(matches!(
        &effects[..],
        [LockEffect::Denied(LockDenial::NotHolder { .. })]
    ));
    assert!(table.get("mutex.X").is_none());
}

#[test]
fn table_destroy_removes_record_only_when_free() {
    let clock = FakeClock::new();
    let mut table = LockTable::new();
    table.apply(&request(LockOp::Acquire, 1), &reply_to(1), &clock);

    let effects = table.apply(&request(LockOp::Destroy, 1), &reply_to(1), &clock);
    assert!(matches!(&effects[..], [LockEffect::Denied(_)]));
    assert!(table.get("mutex.X").is_some());

    table.apply(&request(LockOp::Release, 1), &reply_to(1), &clock);
    let effects = table.apply(&request(LockOp::Destroy, 1), &reply_to(1), &clock);
    assert_eq!(effects, vec![LockEffect::Destroyed]);
    assert!(table.get("mutex.X").is_none());

    let effects = table.apply(&request(LockOp::Destroy, 1), &reply_to(1), &clock);
    assert!(matches!(
        &effects[..],
        [LockEffect::Denied(LockDenial::UnknownLock { .. })]
    ));
}

#[test]
fn table_keeps_lock_names_independent() {
    let clock = FakeClock::new();
    let mut table = LockTable::new();
    table.apply(&request(LockOp::Acquire, 1), &reply_to(1), &clock);

    let other = LockRequest::new(LockOp::Acquire, "mutex.Y", holder(2));
    let effects = table.apply(&other, &reply_to(2), &clock);

    assert_eq!(effects, vec![LockEffect::Granted { holder: holder(2) }]);
    assert_eq!(
        table.stats(),
        LockStats {
            locks: 2,
            held: 2,
            waiting: 0
        }
    );
}

#[test]
fn table_applies_configured_queue_limit() {
    let clock = FakeClock::new();
    let mut table = LockTable::new().with_max_waiters(Some(0));
    table.apply(&request(LockOp::Acquire, 1), &reply_to(1), &clock);

    let effects = table.apply(&request(LockOp::Acquire, 2), &reply_to(2), &clock);

    assert!(matches!(
        &effects[..],
        [LockEffect::Denied(LockDenial::QueueFull { limit: 0, .. })]
    ));
}

mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn arb_op() -> impl Strategy<Value = (LockOp, u32)> {
        (
            prop_oneof![
                4 => Just(LockOp::Acquire),
                4 => Just(LockOp::Release),
                1 => Just(LockOp::Destroy),
            ],
            0..4u32,
        )
    }

    proptest! {
        #[test]
        fn at_most_one_holder_and_fifo_promotion(ops in proptest::collection::vec(arb_op(), 1..60)) {
            let clock = FakeClock::new();
            let mut table = LockTable::new();
            // Reference model: current holder plus queue of waiters
            let mut model_holder: Option<u32> = None;
            let mut model_queue: VecDeque<u32> = VecDeque::new();
            let mut exists = false;

            for (op, n) in ops {
                let effects = table.apply(&request(op, n), &reply_to(n), &clock);

                match op {
                    LockOp::Acquire => {
                        exists = true;
                        if model_holder.is_none() {
                            model_holder = Some(n);
                            prop_assert_eq!(&effects, &vec![LockEffect::Granted { holder: holder(n) }]);
                        } else if model_holder == Some(n) || model_queue.contains(&n) {
                            let denied = matches!(&effects[..], [LockEffect::Denied(_)]);
                            prop_assert!(denied);
                        } else {
                            model_queue.push_back(n);
                            let queued = matches!(&effects[..], [LockEffect::Queued { .. }]);
                            prop_assert!(queued);
                        }
                    }
                    LockOp::Release => {
                        if model_holder == Some(n) {
                            model_holder = model_queue.pop_front();
                            if let Some(next) = model_holder {
                                let promoted = matches!(
                                    &effects[..],
                                    [LockEffect::Released { .. }, LockEffect::Promoted { waiter }]
                                    if waiter.holder == holder(next)
                                );
                                prop_assert!(promoted, "expected promotion of holder-{}", next);
                            }
                        } else {
                            let denied = matches!(&effects[..], [LockEffect::Denied(_)]);
                            prop_assert!(denied);
                        }
                    }
                    LockOp::Destroy => {
                        if exists && model_holder.is_none() {
                            prop_assert_eq!(&effects, &vec![LockEffect::Destroyed]);
                            exists = false;
                        } else {
                            let denied = matches!(&effects[..], [LockEffect::Denied(_)]);
                            prop_assert!(denied);
                        }
                    }
                }

                match table.get("mutex.X") {
                    Some(record) => {
                        prop_assert!(record.is_consistent());
                        prop_assert_eq!(record.holder().cloned(), model_holder.map(holder));
                        let queued: Vec<HolderId> =
                            record.waiters.iter().map(|w| w.holder.clone()).collect();
                        let expected: Vec<HolderId> =
                            model_queue.iter().copied().map(holder).collect();
                        prop_assert_eq!(queued, expected);
                    }
                    None => {
                        prop_assert!(!exists);
                        prop_assert!(model_holder.is_none());
                    }
                }
            }
        }
    }
}
