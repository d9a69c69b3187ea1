// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed mutual exclusion over the bus
//!
//! This module provides:
//! - **protocol** - Acquire/release/destroy vocabulary carried in request properties
//! - **LockRecord** / **LockTable** - Authoritative per-name lock state with a FIFO waiter queue
//! - **LockService** - Handler that serializes lock operations arriving on one address
//! - **LockClient** - Per-process view of one named lock
//!
//! A holder that disappears without releasing keeps the lock forever: there
//! are no leases or heartbeats. The same applies on promotion. When a queued
//! waiter has left the bus, its grant notification cannot be delivered but
//! the service still records it as holder, and every waiter queued behind it
//! waits until the lock is released or destroyed out of band.

mod client;
pub mod protocol;
mod record;
mod service;

pub use client::{LockClient, LockClientState, LockError, LockEvent};
pub use protocol::{Grant, HolderId, LockOp, LockRequest, ProtocolError};
pub use record::{
    LockConfig, LockDenial, LockEffect, LockInput, LockRecord, LockStats, LockStatus, LockTable,
    Waiter,
};
pub use service::{LockService, LockServiceConfig};
