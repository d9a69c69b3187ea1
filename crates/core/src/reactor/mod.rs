// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-threaded event loop for one bus participant
//!
//! A `Reactor` owns one connection, one application [`Handler`] and the
//! endpoints the handler creates. Inbound envelopes are routed by
//! destination address to the endpoint that bound it, turned into typed
//! events, and handed to the handler one at a time.

mod context;
mod handler;

pub use context::{ClientId, Context, LockId, ServerId};
pub use handler::Handler;

use crate::bus::{Connection, Inbox};
use crate::clock::{Clock, SystemClock};
use crate::id::{IdGen, UuidIdGen};
use crate::lock::LockEvent;
use crate::message::{Envelope, Message};
use crate::rpc::ClientEvent;
use context::Route;
use std::sync::Arc;
use tracing::{debug, warn};

/// Event loop driving one handler
pub struct Reactor<H: Handler> {
    handler: H,
    ctx: Context,
    inbox: Inbox,
    started: bool,
}

impl<H: Handler> Reactor<H> {
    pub fn new(connection: Connection, handler: H) -> Self {
        let Connection { transport, inbox } = connection;
        Self {
            handler,
            ctx: Context::new(transport, Arc::new(UuidIdGen), Arc::new(SystemClock)),
            inbox,
            started: false,
        }
    }

    /// Replace the id generator used for correlation ids, reply addresses
    /// and holder identities
    pub fn with_id_gen(mut self, ids: impl IdGen + 'static) -> Self {
        self.ctx.ids = Arc::new(ids);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.ctx.clock = Arc::new(clock);
        self
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn is_stopped(&self) -> bool {
        self.ctx.is_stopped()
    }

    /// Run `on_start` if it has not run yet
    pub fn start(&mut self) {
        if !self.started {
            self.started = true;
            self.handler.on_start(&mut self.ctx);
        }
    }

    /// Process at most one queued envelope without waiting
    ///
    /// Returns whether an envelope was processed.
    pub fn turn(&mut self) -> bool {
        self.start();
        if self.ctx.is_stopped() {
            return false;
        }
        match self.inbox.try_recv() {
            Ok(envelope) => {
                self.dispatch(envelope);
                true
            }
            Err(_) => false,
        }
    }

    /// Process queued envelopes until the inbox is empty
    pub fn run_until_idle(&mut self) -> usize {
        let mut processed = 0;
        while self.turn() {
            processed += 1;
        }
        processed
    }

    /// Process envelopes as they arrive until the handler stops the reactor
    /// or the connection closes
    pub async fn run(&mut self) {
        self.start();
        while !self.ctx.is_stopped() {
            match self.inbox.recv().await {
                Some(envelope) => self.dispatch(envelope),
                None => {
                    debug!("connection closed, reactor exiting");
                    break;
                }
            }
        }
    }

    fn dispatch(&mut self, envelope: Envelope) {
        let Envelope { to, message } = envelope;
        let Some(route) = self.ctx.route(&to) else {
            debug!(%to, kind = message.kind(), "no endpoint bound, dropping message");
            return;
        };

        match (route, message) {
            (Route::Server(server), Message::Request(request)) => {
                self.handler.on_request(&mut self.ctx, server, request);
            }

            (Route::Client(client), Message::Response(response)) => {
                let event = self
                    .ctx
                    .clients
                    .get_mut(&client)
                    .and_then(|c| c.handle_response(response));
                match event {
                    Some(ClientEvent::Response(reply)) => {
                        self.handler.on_response(&mut self.ctx, client, reply)
                    }
                    Some(ClientEvent::Failed(failed)) => {
                        self.handler.on_request_failed(&mut self.ctx, client, failed)
                    }
                    None => {}
                }
            }

            (Route::Client(client), Message::Notification(notification)) => {
                self.handler
                    .on_notification(&mut self.ctx, client, notification);
            }

            (Route::Client(client), Message::Ready(ready)) => {
                let first = self
                    .ctx
                    .clients
                    .get_mut(&client)
                    .is_some_and(|c| c.handle_ready(&ready.service));
                if first {
                    self.handler.on_service_ready(&mut self.ctx, client);
                }
            }

            (Route::Lock(lock), Message::Ready(ready)) => {
                let first = self
                    .ctx
                    .locks
                    .get_mut(&lock)
                    .is_some_and(|l| l.handle_ready(&ready.service));
                if first {
                    self.handler.on_lock_ready(&mut self.ctx, lock);
                }
            }

            (Route::Lock(lock), Message::Response(response)) => {
                let event = self
                    .ctx
                    .locks
                    .get_mut(&lock)
                    .and_then(|l| l.handle_response(response));
                self.deliver_lock_event(lock, event);
            }

            (Route::Lock(lock), Message::Notification(notification)) => {
                let event = self
                    .ctx
                    .locks
                    .get_mut(&lock)
                    .and_then(|l| l.handle_notification(notification));
                self.deliver_lock_event(lock, event);
            }

            (route, message) => {
                warn!(%to, ?route, kind = message.kind(), "unexpected message for endpoint, dropping");
            }
        }
    }

    fn deliver_lock_event(&mut self, lock: LockId, event: Option<LockEvent>) {
        match event {
            Some(LockEvent::Acquired) => self.handler.on_lock_acquired(&mut self.ctx, lock),
            Some(LockEvent::Failed(error)) => {
                self.handler.on_lock_failed(&mut self.ctx, lock, error)
            }
            Some(LockEvent::Released) => self.handler.on_lock_released(&mut self.ctx, lock),
            Some(LockEvent::Destroyed) => self.handler.on_lock_destroyed(&mut self.ctx, lock),
            None => {}
        }
    }
}

/// Anything that can be stepped one envelope at a time
///
/// Lets tests and single-threaded drivers interleave several reactors with
/// different handler types.
pub trait Turn {
    fn start(&mut self);
    fn turn(&mut self) -> bool;
}

impl<H: Handler> Turn for Reactor<H> {
    fn start(&mut self) {
        Reactor::start(self)
    }

    fn turn(&mut self) -> bool {
        Reactor::turn(self)
    }
}

/// Step every participant round-robin until none has work left
///
/// Returns the number of envelopes processed.
pub fn pump(participants: &mut [&mut dyn Turn]) -> usize {
    for participant in participants.iter_mut() {
        participant.start();
    }
    let mut processed = 0;
    loop {
        let mut progressed = false;
        for participant in participants.iter_mut() {
            if participant.turn() {
                processed += 1;
                progressed = true;
            }
        }
        if !progressed {
            return processed;
        }
    }
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod tests;
