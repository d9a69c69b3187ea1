//! sp-core: request/response correlation and distributed locking over a message bus
//!
//! This crate provides:
//! - A bus seam (`BusConnection`) plus an in-memory transport
//! - Correlated request/response endpoints with explicit per-client state
//! - A lock service that serializes lock operations per name, and the
//!   client-side lock state machine that talks to it
//! - A single-threaded reactor that routes inbound messages to handlers

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod id;

pub mod bus;
pub mod message;

// Layers (order matters for dependencies)
pub mod rpc;
pub mod lock;
pub mod reactor;

// Re-exports
pub use bus::{BusConnection, BusError, Connection, InMemoryBus, SharedConnection};
pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use message::{
    Address, CorrelationId, Envelope, Failure, FailureKind, Message, Notification, Outcome,
    Properties, Ready, Request, Response, Value, OPCODE,
};
pub use rpc::{ClientEvent, Reply, RequestClient, RequestFailed, RequestServer, RpcError};
pub use lock::{
    HolderId, LockClient, LockClientState, LockError, LockEvent, LockOp, LockService,
    LockServiceConfig, LockStats,
};
pub use reactor::{pump, ClientId, Context, Handler, LockId, Reactor, ServerId, Turn};
