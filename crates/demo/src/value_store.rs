// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single integer behind a GET/SET request server

use sp_core::{Address, Context, Failure, Handler, Properties, Request, ServerId, OPCODE};
use tracing::{debug, error, info, warn};

pub const PROP_VALUE: &str = "value";

/// Serves `GET` and `SET` for one stored integer
///
/// The store does no locking of its own; concurrent clients must serialize
/// their read-modify-write cycles through a lock.
pub struct ValueStore {
    address: Address,
    value: i64,
    served: u64,
}

impl ValueStore {
    pub fn new(address: impl Into<Address>) -> Self {
        Self {
            address: address.into(),
            value: 0,
            served: 0,
        }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn served(&self) -> u64 {
        self.served
    }

    fn handle(&mut self, mut properties: Properties) -> Result<Properties, Failure> {
        if properties.is_empty() {
            return Err(Failure::protocol("request has no properties"));
        }
        match properties.opcode() {
            Some("GET") => {
                properties.insert(PROP_VALUE, self.value);
                Ok(properties)
            }
            Some("SET") => {
                let value = properties
                    .get_i64(PROP_VALUE)
                    .ok_or_else(|| Failure::protocol("SET requires an integer value"))?;
                debug!(old = self.value, new = value, "value stored");
                self.value = value;
                Ok(properties)
            }
            Some(other) => Err(Failure::protocol(format!("unknown opcode: {}", other))),
            None => Err(Failure::protocol("missing property: opcode")),
        }
    }
}

impl Handler for ValueStore {
    fn on_start(&mut self, ctx: &mut Context) {
        if let Err(e) = ctx.serve(self.address.clone()) {
            error!(address = %self.address, error = %e, "value store failed to bind");
            ctx.stop();
            return;
        }
        info!(address = %self.address, "value store listening");
    }

    fn on_request(&mut self, ctx: &mut Context, server: ServerId, request: Request) {
        self.served += 1;
        let result = match self.handle(request.properties.clone()) {
            Ok(properties) => ctx.reply(server, request, properties),
            Err(failure) => {
                warn!(correlation_id = %request.correlation_id, %failure, "rejecting request");
                ctx.fail(server, request, failure)
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to answer value store request");
        }
    }
}

#[cfg(test)]
#[path = "value_store_tests.rs"]
mod tests;
