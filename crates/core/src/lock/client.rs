// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-process state machine for one named lock
//!
//! ```text
//! Idle --acquire--> Acquiring --granted--> Held --release--> Releasing --ack--> Idle
//!                   Acquiring --denied---> Failed --rearm--> Idle
//! Idle --destroy--> Destroying --ack--> Destroyed
//!                   Destroying --denied--> Idle
//! ```

use super::protocol::{Grant, HolderId, LockOp, LockRequest};
use crate::message::{Address, CorrelationId, Failure, Notification, Response};
use crate::rpc::{ClientEvent, RequestClient, RpcError};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockClientState {
    Idle,
    Acquiring,
    Held,
    Releasing,
    Destroying,
    Destroyed,
    Failed,
}

impl fmt::Display for LockClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockClientState::Idle => "idle",
            LockClientState::Acquiring => "acquiring",
            LockClientState::Held => "held",
            LockClientState::Releasing => "releasing",
            LockClientState::Destroying => "destroying",
            LockClientState::Destroyed => "destroyed",
            LockClientState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Error)]
pub enum LockError {
    #[error("cannot {op} lock {lock} while {state}")]
    InvalidState {
        lock: String,
        op: LockOp,
        state: LockClientState,
    },

    #[error("lock {0} is still held; release it before destroying")]
    StillHeld(String),

    #[error("lock service refused to {op} {lock}: {failure}")]
    Denied {
        lock: String,
        op: LockOp,
        failure: Failure,
    },

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Outcome reported to the application
#[derive(Debug)]
pub enum LockEvent {
    Acquired,
    Failed(LockError),
    Released,
    Destroyed,
}

/// Local view of one named lock
///
/// Operations invalid for the current state fail immediately without
/// touching the bus. Nothing is retried implicitly: after a denied acquire
/// the caller must `rearm()` before acquiring again.
pub struct LockClient {
    name: String,
    holder: HolderId,
    client: RequestClient,
    state: LockClientState,
    in_flight: Option<CorrelationId>,
}

impl LockClient {
    pub fn new(name: impl Into<String>, holder: HolderId, client: RequestClient) -> Self {
        Self {
            name: name.into(),
            holder,
            client,
            state: LockClientState::Idle,
            in_flight: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }

    pub fn state(&self) -> LockClientState {
        self.state
    }

    pub fn is_held(&self) -> bool {
        self.state == LockClientState::Held
    }

    /// Where replies and grant notifications for this lock arrive
    pub fn notify_address(&self) -> &Address {
        self.client.reply_to()
    }

    pub fn acquire(&mut self) -> Result<(), LockError> {
        self.expect_state(LockOp::Acquire, LockClientState::Idle)?;
        self.send(LockOp::Acquire)?;
        self.state = LockClientState::Acquiring;
        Ok(())
    }

    pub fn release(&mut self) -> Result<(), LockError> {
        self.expect_state(LockOp::Release, LockClientState::Held)?;
        self.send(LockOp::Release)?;
        self.state = LockClientState::Releasing;
        Ok(())
    }

    /// Ask the service to drop the lock record
    ///
    /// Only valid while idle. A held lock is never released implicitly.
    pub fn destroy(&mut self) -> Result<(), LockError> {
        if self.state == LockClientState::Held {
            return Err(LockError::StillHeld(self.name.clone()));
        }
        self.expect_state(LockOp::Destroy, LockClientState::Idle)?;
        self.send(LockOp::Destroy)?;
        self.state = LockClientState::Destroying;
        Ok(())
    }

    /// Leave `Failed` so a new acquisition can be attempted
    pub fn rearm(&mut self) -> Result<(), LockError> {
        self.expect_state(LockOp::Acquire, LockClientState::Failed)?;
        self.state = LockClientState::Idle;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.client.stop();
        self.in_flight = None;
    }

    /// Feed a response that arrived on the notify address
    pub fn handle_response(&mut self, response: Response) -> Option<LockEvent> {
        let event = self.client.handle_response(response)?;
        self.in_flight = None;

        let (next, lock_event) = match (self.state, event) {
            (LockClientState::Acquiring, ClientEvent::Response(_)) => {
                info!(lock = %self.name, holder = %self.holder, "lock acquired");
                (LockClientState::Held, LockEvent::Acquired)
            }
            (LockClientState::Acquiring, ClientEvent::Failed(failed)) => (
                LockClientState::Failed,
                LockEvent::Failed(self.denied(LockOp::Acquire, failed.failure)),
            ),
            (LockClientState::Releasing, ClientEvent::Response(_)) => {
                info!(lock = %self.name, holder = %self.holder, "lock released");
                (LockClientState::Idle, LockEvent::Released)
            }
            (LockClientState::Releasing, ClientEvent::Failed(failed)) => (
                LockClientState::Failed,
                LockEvent::Failed(self.denied(LockOp::Release, failed.failure)),
            ),
            (LockClientState::Destroying, ClientEvent::Response(_)) => {
                info!(lock = %self.name, "lock destroyed");
                (LockClientState::Destroyed, LockEvent::Destroyed)
            }
            (LockClientState::Destroying, ClientEvent::Failed(failed)) => (
                LockClientState::Idle,
                LockEvent::Failed(self.denied(LockOp::Destroy, failed.failure)),
            ),
            (state, event) => {
                warn!(lock = %self.name, %state, ?event, "response does not match lock state, ignoring");
                return None;
            }
        };

        self.state = next;
        Some(lock_event)
    }

    /// Whether the lock service address has been reported reachable
    pub fn is_ready(&self) -> bool {
        self.client.is_ready()
    }

    /// Feed a transport ready signal; true the first time the lock service
    /// becomes reachable
    pub fn handle_ready(&mut self, service: &Address) -> bool {
        self.client.handle_ready(service)
    }

    /// Feed an unsolicited notification that arrived on the notify address
    pub fn handle_notification(&mut self, notification: Notification) -> Option<LockEvent> {
        let grant = match Grant::from_properties(&notification.properties) {
            Ok(grant) => grant,
            Err(e) => {
                warn!(lock = %self.name, from = %notification.from, error = %e, "ignoring malformed lock notification");
                return None;
            }
        };

        if grant.lock != self.name || grant.holder != self.holder {
            debug!(lock = %self.name, granted = %grant.lock, "grant for someone else, ignoring");
            return None;
        }
        if self.state != LockClientState::Acquiring {
            warn!(lock = %self.name, state = %self.state, "unexpected grant, ignoring");
            return None;
        }

        // The queued acquire never gets a reply of its own
        if let Some(pending) = self.in_flight.take() {
            self.client.abandon(&pending);
        }
        self.state = LockClientState::Held;
        info!(lock = %self.name, holder = %self.holder, "lock acquired after waiting");
        Some(LockEvent::Acquired)
    }

    fn expect_state(&self, op: LockOp, expected: LockClientState) -> Result<(), LockError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LockError::InvalidState {
                lock: self.name.clone(),
                op,
                state: self.state,
            })
        }
    }

    fn send(&mut self, op: LockOp) -> Result<(), LockError> {
        let request = LockRequest::new(op, self.name.clone(), self.holder.clone());
        let id = self.client.request(request.to_properties(), None)?;
        debug!(lock = %self.name, %op, correlation_id = %id, "lock request sent");
        self.in_flight = Some(id);
        Ok(())
    }

    fn denied(&self, op: LockOp, failure: Failure) -> LockError {
        warn!(lock = %self.name, %op, %failure, "lock request denied");
        LockError::Denied {
            lock: self.name.clone(),
            op,
            failure,
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
