// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Demo applications built on sp-core
//!
//! A value store and competing increment clients that serialize their
//! read-modify-write cycles through a named lock.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
mod increment;
mod scenario;
mod value_store;

pub use config::{ConfigError, DemoConfig};
pub use increment::{IncrementClient, IncrementOutcome};
pub use scenario::{run, DemoError, DemoReport};
pub use value_store::{ValueStore, PROP_VALUE};
