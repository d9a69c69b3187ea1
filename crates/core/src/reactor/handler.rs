// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Application callbacks invoked by the reactor

use super::context::{ClientId, Context, LockId, ServerId};
use crate::lock::LockError;
use crate::message::{Failure, Notification, Request};
use crate::rpc::{Reply, RequestFailed};
use tracing::warn;

/// Capability set an application implements to be driven by a [`Reactor`]
///
/// Every callback runs to completion before the next inbound message is
/// processed. Callbacks must not block; anything that talks to the bus
/// returns immediately and reports back through a later callback.
///
/// [`Reactor`]: super::Reactor
pub trait Handler {
    /// Called once before the first message; create endpoints here
    fn on_start(&mut self, ctx: &mut Context);

    /// A request arrived on one of this process's servers
    ///
    /// The handler owes exactly one `ctx.reply` or `ctx.fail` per request.
    fn on_request(&mut self, ctx: &mut Context, server: ServerId, request: Request) {
        warn!(correlation_id = %request.correlation_id, "no request handler, failing request");
        if let Err(e) = ctx.fail(server, request, Failure::application("request not handled")) {
            warn!(error = %e, "failed to reject unhandled request");
        }
    }

    /// The service behind a request client became reachable
    ///
    /// Fires at most once per client. Requests sent before this are likely
    /// to fail as unroutable.
    fn on_service_ready(&mut self, _ctx: &mut Context, _client: ClientId) {}

    fn on_response(&mut self, _ctx: &mut Context, _client: ClientId, _reply: Reply) {}

    fn on_request_failed(&mut self, _ctx: &mut Context, _client: ClientId, _failed: RequestFailed) {}

    /// An unsolicited message arrived on a client's reply address
    fn on_notification(
        &mut self,
        _ctx: &mut Context,
        _client: ClientId,
        _notification: Notification,
    ) {
    }

    /// The lock service behind a lock client became reachable
    fn on_lock_ready(&mut self, _ctx: &mut Context, _lock: LockId) {}

    fn on_lock_acquired(&mut self, _ctx: &mut Context, _lock: LockId) {}

    fn on_lock_failed(&mut self, _ctx: &mut Context, _lock: LockId, _error: LockError) {}

    fn on_lock_released(&mut self, _ctx: &mut Context, _lock: LockId) {}

    fn on_lock_destroyed(&mut self, _ctx: &mut Context, _lock: LockId) {}
}
