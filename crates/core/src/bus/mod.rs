// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message bus seam
//!
//! This module provides:
//! - `BusConnection` - What the core needs from a transport: bind addresses,
//!   send envelopes, close
//! - `Connection` - A transport handle paired with the inbox it fills
//! - `InMemoryBus` - In-process transport for tests and single-process demos
//!
//! Framing, encoding and session management of a real broker live behind
//! `BusConnection`; the core only assumes in-order delivery between one
//! sender and one receiver.

mod memory;

pub use memory::{InMemoryBus, InMemoryConnection};

use crate::message::{Address, Envelope};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Sender half a transport uses to deliver inbound envelopes
pub type InboxSender = mpsc::UnboundedSender<Envelope>;
/// Inbound envelopes for one connection, consumed by its reactor
pub type Inbox = mpsc::UnboundedReceiver<Envelope>;

/// Transport handle shared by every endpoint of a reactor
pub type SharedConnection = Arc<dyn BusConnection>;

/// Outbound side of a bus connection
///
/// Inbound envelopes for every bound address arrive on the [`Inbox`] handed
/// out together with the connection.
pub trait BusConnection: Send + Sync {
    /// Start routing envelopes addressed to `address` into this connection's inbox
    fn subscribe(&self, address: &Address) -> Result<(), BusError>;

    /// Stop routing `address` to this connection
    fn unsubscribe(&self, address: &Address);

    /// Send an envelope to `envelope.to`
    fn send(&self, envelope: Envelope) -> Result<(), BusError>;

    /// Deliver a [`Ready`] envelope to `notify` once `service` has a
    /// subscriber, immediately if it already has one
    ///
    /// [`Ready`]: crate::message::Ready
    fn watch(&self, service: &Address, notify: &Address) -> Result<(), BusError>;

    /// Release every subscription; the inbox ends once drained
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A transport handle together with its inbox
pub struct Connection {
    pub transport: SharedConnection,
    pub inbox: Inbox,
}

impl Connection {
    pub fn new(transport: SharedConnection, inbox: Inbox) -> Self {
        Self { transport, inbox }
    }
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum BusError {
    #[error("connection closed")]
    Closed,

    #[error("no subscriber for address: {0}")]
    Unroutable(Address),

    #[error("address already bound by another connection: {0}")]
    AddressInUse(Address),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
