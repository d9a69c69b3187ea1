// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authoritative lock state held by the lock service
//!
//! `LockRecord::transition` is pure: it returns the next record and the
//! effects the service must carry out (reply, fail, notify a waiter).

use super::protocol::{HolderId, LockOp, LockRequest};
use crate::clock::Clock;
use crate::message::{Address, Failure};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use thiserror::Error;

/// Per-lock settings
#[derive(Clone, Debug)]
pub struct LockConfig {
    pub name: String,
    /// Longest allowed waiter queue; `None` is unbounded
    pub max_waiters: Option<usize>,
}

impl LockConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_waiters: None,
        }
    }

    pub fn with_max_waiters(mut self, max_waiters: Option<usize>) -> Self {
        self.max_waiters = max_waiters;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockStatus {
    Free,
    Held { holder: HolderId, since: Instant },
}

/// A requester queued behind the current holder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Waiter {
    pub holder: HolderId,
    /// Where the promotion notification goes
    pub notify: Address,
    pub queued_at: Instant,
}

/// One named lock: holder plus FIFO waiters
#[derive(Clone, Debug)]
pub struct LockRecord {
    pub config: LockConfig,
    pub status: LockStatus,
    pub waiters: VecDeque<Waiter>,
}

#[derive(Clone, Debug)]
pub enum LockInput {
    Acquire { holder: HolderId, notify: Address },
    Release { holder: HolderId },
    Destroy { holder: HolderId },
}

/// Why the service refused an operation; the record is left unchanged
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LockDenial {
    #[error("{holder} already holds lock {lock}")]
    AlreadyHolder { lock: String, holder: HolderId },

    #[error("{holder} is already waiting for lock {lock}")]
    AlreadyWaiting { lock: String, holder: HolderId },

    #[error("lock {lock} already has {limit} waiters")]
    QueueFull { lock: String, limit: usize },

    #[error("{requester} is not the holder of lock {lock}")]
    NotHolder { lock: String, requester: HolderId },

    #[error("unknown lock: {lock}")]
    UnknownLock { lock: String },

    #[error("lock {lock} is held by {holder}")]
    Held { lock: String, holder: HolderId },

    #[error("lock {lock} has {waiting} waiters")]
    HasWaiters { lock: String, waiting: usize },
}

impl From<LockDenial> for Failure {
    fn from(denial: LockDenial) -> Self {
        Failure::state_violation(denial.to_string())
    }
}

/// What the service must do after a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockEffect {
    /// Reply success to the acquire request
    Granted { holder: HolderId },
    /// Hold back the reply; the requester is waiting at `position` (1-based)
    Queued { holder: HolderId, position: usize },
    /// Reply success to the release request
    Released { holder: HolderId },
    /// Notify a waiter that it now holds the lock
    Promoted { waiter: Waiter },
    /// Reply success to the destroy request and drop the record
    Destroyed,
    /// Fail the request
    Denied(LockDenial),
}

impl LockRecord {
    pub fn new(config: LockConfig) -> Self {
        Self {
            config,
            status: LockStatus::Free,
            waiters: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_free(&self) -> bool {
        matches!(self.status, LockStatus::Free)
    }

    pub fn is_held_by(&self, holder: &HolderId) -> bool {
        matches!(&self.status, LockStatus::Held { holder: h, .. } if h == holder)
    }

    pub fn holder(&self) -> Option<&HolderId> {
        match &self.status {
            LockStatus::Free => None,
            LockStatus::Held { holder, .. } => Some(holder),
        }
    }

    pub fn is_waiting(&self, holder: &HolderId) -> bool {
        self.waiters.iter().any(|w| &w.holder == holder)
    }

    /// Holder and queue agree: a free lock has no waiters, the holder is never
    /// queued, and nobody is queued twice
    pub fn is_consistent(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        let unique = self.waiters.iter().all(|w| seen.insert(&w.holder));
        match &self.status {
            LockStatus::Free => self.waiters.is_empty(),
            LockStatus::Held { holder, .. } => unique && !self.is_waiting(holder),
        }
    }

    /// Pure state transition function
    pub fn transition(&self, input: LockInput, clock: &dyn Clock) -> (LockRecord, Vec<LockEffect>) {
        let mut next = self.clone();
        let mut effects = Vec::new();
        let lock = self.config.name.clone();

        match input {
            LockInput::Acquire { holder, notify } => match &self.status {
                LockStatus::Free => {
                    next.status = LockStatus::Held {
                        holder: holder.clone(),
                        since: clock.now(),
                    };
                    effects.push(LockEffect::Granted { holder });
                }
                LockStatus::Held { holder: current, .. } if *current == holder => {
                    effects.push(LockEffect::Denied(LockDenial::AlreadyHolder { lock, holder }));
                }
                LockStatus::Held { .. } if self.is_waiting(&holder) => {
                    effects.push(LockEffect::Denied(LockDenial::AlreadyWaiting { lock, holder }));
                }
                LockStatus::Held { .. } => match self.config.max_waiters {
                    Some(limit) if self.waiters.len() >= limit => {
                        effects.push(LockEffect::Denied(LockDenial::QueueFull { lock, limit }));
                    }
                    _ => {
                        next.waiters.push_back(Waiter {
                            holder: holder.clone(),
                            notify,
                            queued_at: clock.now(),
                        });
                        effects.push(LockEffect::Queued {
                            holder,
                            position: next.waiters.len(),
                        });
                    }
                },
            },

            LockInput::Release { holder } => {
                if self.is_held_by(&holder) {
                    effects.push(LockEffect::Released { holder });
                    match next.waiters.pop_front() {
                        Some(waiter) => {
                            next.status = LockStatus::Held {
                                holder: waiter.holder.clone(),
                                since: clock.now(),
                            };
                            effects.push(LockEffect::Promoted { waiter });
                        }
                        None => next.status = LockStatus::Free,
                    }
                } else {
                    effects.push(LockEffect::Denied(LockDenial::NotHolder {
                        lock,
                        requester: holder,
                    }));
                }
            }

            LockInput::Destroy { .. } => match &self.status {
                LockStatus::Held { holder, .. } => {
                    effects.push(LockEffect::Denied(LockDenial::Held {
                        lock,
                        holder: holder.clone(),
                    }));
                }
                LockStatus::Free if !self.waiters.is_empty() => {
                    effects.push(LockEffect::Denied(LockDenial::HasWaiters {
                        lock,
                        waiting: self.waiters.len(),
                    }));
                }
                LockStatus::Free => effects.push(LockEffect::Destroyed),
            },
        }

        (next, effects)
    }
}

/// Summary counts for logging
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LockStats {
    pub locks: usize,
    pub held: usize,
    pub waiting: usize,
}

/// Every lock known to one service, keyed by name
///
/// Operations on one name are applied strictly in call order. Records are
/// created on first acquire and removed only by a successful destroy.
#[derive(Clone, Debug, Default)]
pub struct LockTable {
    locks: HashMap<String, LockRecord>,
    max_waiters: Option<usize>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_waiters(mut self, max_waiters: Option<usize>) -> Self {
        self.max_waiters = max_waiters;
        self
    }

    pub fn get(&self, name: &str) -> Option<&LockRecord> {
        self.locks.get(name)
    }

    pub fn lock_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.locks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            locks: self.locks.len(),
            held: self.locks.values().filter(|r| !r.is_free()).count(),
            waiting: self.locks.values().map(|r| r.waiters.len()).sum(),
        }
    }

    /// Apply one request; `notify` is where the requester hears about a
    /// deferred grant
    pub fn apply(
        &mut self,
        request: &LockRequest,
        notify: &Address,
        clock: &dyn Clock,
    ) -> Vec<LockEffect> {
        let holder = request.requester.clone();
        let input = match request.op {
            LockOp::Acquire => LockInput::Acquire {
                holder,
                notify: notify.clone(),
            },
            LockOp::Release => LockInput::Release { holder },
            LockOp::Destroy => LockInput::Destroy { holder },
        };

        let record = match self.locks.get(&request.lock) {
            Some(record) => record.clone(),
            None => match request.op {
                LockOp::Acquire => LockRecord::new(
                    LockConfig::new(&request.lock).with_max_waiters(self.max_waiters),
                ),
                LockOp::Release => {
                    return vec![LockEffect::Denied(LockDenial::NotHolder {
                        lock: request.lock.clone(),
                        requester: request.requester.clone(),
                    })]
                }
                LockOp::Destroy => {
                    return vec![LockEffect::Denied(LockDenial::UnknownLock {
                        lock: request.lock.clone(),
                    })]
                }
            },
        };

        let (next, effects) = record.transition(input, clock);
        if effects.contains(&LockEffect::Destroyed) {
            self.locks.remove(&request.lock);
        } else {
            debug_assert!(next.is_consistent());
            self.locks.insert(request.lock.clone(), next);
        }
        effects
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
