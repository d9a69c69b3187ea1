// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock service: the single serialization point for every lock name it owns

use super::protocol::{Grant, LockRequest};
use super::record::{LockEffect, LockStats, LockTable};
use crate::message::{Address, Failure, Request};
use crate::reactor::{Context, Handler, ServerId};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Lock service settings
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockServiceConfig {
    /// Longest waiter queue per lock; unbounded when absent
    pub max_waiters: Option<usize>,
}

/// Handler that owns the authoritative lock table
///
/// Requests are processed one at a time in arrival order, which totally
/// orders operations on each lock name across all client processes.
pub struct LockService {
    address: Address,
    table: LockTable,
    server: Option<ServerId>,
}

impl LockService {
    pub fn new(address: impl Into<Address>, config: LockServiceConfig) -> Self {
        Self {
            address: address.into(),
            table: LockTable::new().with_max_waiters(config.max_waiters),
            server: None,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn table(&self) -> &LockTable {
        &self.table
    }

    pub fn stats(&self) -> LockStats {
        self.table.stats()
    }

    fn execute(
        &self,
        ctx: &mut Context,
        server: ServerId,
        request: Request,
        lock_request: &LockRequest,
        effects: Vec<LockEffect>,
    ) {
        let mut request = Some(request);
        let lock = lock_request.lock.as_str();

        for effect in effects {
            match effect {
                LockEffect::Granted { holder } => {
                    info!(lock, %holder, "lock granted");
                    self.answer(ctx, server, request.take(), lock_request, None);
                }
                LockEffect::Released { holder } => {
                    info!(lock, %holder, "lock released");
                    self.answer(ctx, server, request.take(), lock_request, None);
                }
                LockEffect::Destroyed => {
                    info!(lock, "lock destroyed");
                    self.answer(ctx, server, request.take(), lock_request, None);
                }
                LockEffect::Denied(denial) => {
                    info!(lock, %denial, "lock request denied");
                    self.answer(ctx, server, request.take(), lock_request, Some(denial.into()));
                }
                LockEffect::Queued { holder, position } => {
                    info!(lock, %holder, position, "lock busy, requester queued");
                    // Reply deferred until promotion
                    request.take();
                }
                LockEffect::Promoted { waiter } => {
                    info!(lock, holder = %waiter.holder, "waiter promoted to holder");
                    let grant = Grant {
                        lock: lock.to_string(),
                        holder: waiter.holder.clone(),
                    };
                    if let Err(e) = ctx.notify(server, &waiter.notify, grant.to_properties()) {
                        // Still the holder: a departed waiter blocks the queue
                        // behind it, see the module docs.
                        warn!(lock, holder = %waiter.holder, error = %e, "failed to notify promoted waiter");
                    }
                }
            }
        }
    }

    fn answer(
        &self,
        ctx: &mut Context,
        server: ServerId,
        request: Option<Request>,
        lock_request: &LockRequest,
        denial: Option<Failure>,
    ) {
        let Some(request) = request else {
            return;
        };
        let result = match denial {
            None => ctx.reply(server, request, lock_request.success_properties()),
            Some(failure) => ctx.fail(server, request, failure),
        };
        if let Err(e) = result {
            warn!(lock = %lock_request.lock, op = %lock_request.op, error = %e, "failed to answer lock request");
        }
    }
}

impl Handler for LockService {
    fn on_start(&mut self, ctx: &mut Context) {
        match ctx.serve(self.address.clone()) {
            Ok(server) => {
                info!(address = %self.address, "lock service listening");
                self.server = Some(server);
            }
            Err(e) => {
                error!(address = %self.address, error = %e, "lock service failed to bind");
                ctx.stop();
            }
        }
    }

    fn on_request(&mut self, ctx: &mut Context, server: ServerId, request: Request) {
        let lock_request = match LockRequest::from_properties(&request.properties) {
            Ok(lock_request) => lock_request,
            Err(e) => {
                warn!(correlation_id = %request.correlation_id, error = %e, "malformed lock request");
                if let Err(e) = ctx.fail(server, request, e) {
                    warn!(error = %e, "failed to reject malformed lock request");
                }
                return;
            }
        };

        let effects = self
            .table
            .apply(&lock_request, &request.reply_to, ctx.clock());
        self.execute(ctx, server, request, &lock_request, effects);
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
