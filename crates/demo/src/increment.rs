// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-modify-write client that increments the stored value under a lock
//!
//! ```text
//! start -> (store and lock service ready) -> acquire -> GET -> SET value+1
//!       -> release -> destroy -> stop
//! ```

use crate::value_store::PROP_VALUE;
use sp_core::{
    Address, ClientId, Context, Handler, LockError, LockId, LockOp, Properties, Reply,
    RequestFailed, OPCODE,
};
use tracing::{debug, info, warn};

/// How one increment client finished
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncrementOutcome {
    Pending,
    /// The value this client wrote
    Incremented(i64),
    LockFailed(String),
    Failed(String),
}

pub struct IncrementClient {
    service: Address,
    lock_service: Address,
    lock_name: String,
    client: Option<ClientId>,
    lock: Option<LockId>,
    service_ready: bool,
    lock_ready: bool,
    outcome: IncrementOutcome,
}

impl IncrementClient {
    pub fn new(
        service: impl Into<Address>,
        lock_service: impl Into<Address>,
        lock_name: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            lock_service: lock_service.into(),
            lock_name: lock_name.into(),
            client: None,
            lock: None,
            service_ready: false,
            lock_ready: false,
            outcome: IncrementOutcome::Pending,
        }
    }

    pub fn outcome(&self) -> &IncrementOutcome {
        &self.outcome
    }

    fn fail(&mut self, ctx: &mut Context, reason: String) {
        warn!(lock = %self.lock_name, %reason, "increment failed");
        self.outcome = IncrementOutcome::Failed(reason);
        match self.lock {
            Some(lock) if ctx.lock_client(lock).is_some_and(|l| l.is_held()) => {
                if let Err(e) = ctx.release(lock) {
                    warn!(error = %e, "failed to release lock");
                    ctx.stop();
                }
            }
            _ => ctx.stop(),
        }
    }

    /// Acquire once both the store and the lock service are reachable
    fn acquire_when_ready(&mut self, ctx: &mut Context) {
        let Some(lock) = self.lock else {
            return;
        };
        if !(self.service_ready && self.lock_ready) {
            return;
        }
        debug!(lock = %self.lock_name, "services ready, acquiring");
        if let Err(e) = ctx.acquire(lock) {
            self.fail(ctx, format!("acquire failed to send: {}", e));
        }
    }

    fn send(&mut self, ctx: &mut Context, properties: Properties, user_context: &str) {
        let Some(client) = self.client else {
            return;
        };
        if let Err(e) = ctx.request_with_context(client, properties, user_context) {
            self.fail(ctx, format!("request failed to send: {}", e));
        }
    }
}

impl Handler for IncrementClient {
    fn on_start(&mut self, ctx: &mut Context) {
        let setup = ctx
            .request_client(self.service.clone())
            .and_then(|client| {
                let lock = ctx.lock(self.lock_name.clone(), self.lock_service.clone())?;
                Ok((client, lock))
            });
        let (client, lock) = match setup {
            Ok(endpoints) => endpoints,
            Err(e) => {
                self.fail(ctx, format!("setup failed: {}", e));
                return;
            }
        };
        self.client = Some(client);
        self.lock = Some(lock);
    }

    fn on_service_ready(&mut self, ctx: &mut Context, _client: ClientId) {
        self.service_ready = true;
        self.acquire_when_ready(ctx);
    }

    fn on_lock_ready(&mut self, ctx: &mut Context, _lock: LockId) {
        self.lock_ready = true;
        self.acquire_when_ready(ctx);
    }

    fn on_lock_acquired(&mut self, ctx: &mut Context, _lock: LockId) {
        debug!(lock = %self.lock_name, "reading value");
        self.send(ctx, Properties::new().with(OPCODE, "GET"), "Read");
    }

    fn on_response(&mut self, ctx: &mut Context, _client: ClientId, reply: Reply) {
        let value = reply.properties.get_i64(PROP_VALUE);
        match (reply.properties.opcode(), value) {
            (Some("GET"), Some(value)) => match value.checked_add(1) {
                Some(incremented) => {
                    let next = Properties::new()
                        .with(OPCODE, "SET")
                        .with(PROP_VALUE, incremented);
                    self.send(ctx, next, "Write");
                }
                None => self.fail(ctx, format!("stored value {} cannot be incremented", value)),
            },
            (Some("SET"), Some(value)) => {
                println!("Value set to {}", value);
                info!(value, "value incremented");
                self.outcome = IncrementOutcome::Incremented(value);
                if let Some(lock) = self.lock {
                    if let Err(e) = ctx.release(lock) {
                        warn!(error = %e, "failed to release lock");
                        ctx.stop();
                    }
                }
            }
            (opcode, _) => {
                let reason = format!("unexpected reply: opcode {:?}", opcode);
                self.fail(ctx, reason);
            }
        }
    }

    fn on_request_failed(&mut self, ctx: &mut Context, _client: ClientId, failed: RequestFailed) {
        let context = failed.user_context.unwrap_or_default();
        self.fail(ctx, format!("{} failed: {}", context, failed.failure));
    }

    fn on_lock_failed(&mut self, ctx: &mut Context, _lock: LockId, error: LockError) {
        match error {
            // Other clients are still queued; the last one out cleans up
            LockError::Denied {
                op: LockOp::Destroy,
                ..
            } => debug!(lock = %self.lock_name, "lock still in use, not destroyed"),
            error => {
                println!("Lock Failed");
                self.outcome = IncrementOutcome::LockFailed(error.to_string());
            }
        }
        ctx.stop();
    }

    fn on_lock_released(&mut self, ctx: &mut Context, lock: LockId) {
        if let Err(e) = ctx.destroy(lock) {
            debug!(error = %e, "not destroying lock");
            ctx.stop();
        }
    }

    fn on_lock_destroyed(&mut self, ctx: &mut Context, _lock: LockId) {
        debug!(lock = %self.lock_name, "lock destroyed");
        ctx.stop();
    }
}

#[cfg(test)]
#[path = "increment_tests.rs"]
mod tests;
