// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response correlation over the bus
//!
//! This module provides:
//! - `CorrelationTable` - Pending requests of one client, keyed by correlation id
//! - `RequestClient` - Issues correlated requests to one service address
//! - `RequestServer` - Receives requests on one address and answers them
//!
//! Nothing here retries or times out. A caller that wants a deadline reads
//! `RequestClient::pending()` and calls `RequestClient::abandon()`.

mod client;
mod server;
mod table;

pub use client::{ClientEvent, Reply, RequestClient, RequestFailed};
pub use server::RequestServer;
pub use table::{CorrelationTable, PendingRequest, PendingState};

use crate::bus::BusError;
use crate::message::CorrelationId;
use thiserror::Error;

/// Errors raised locally by the correlation layer
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("endpoint stopped")]
    Stopped,

    #[error("correlation id already pending: {0}")]
    DuplicateCorrelation(CorrelationId),

    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),
}
