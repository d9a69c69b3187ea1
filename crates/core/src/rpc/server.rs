// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server side of the correlation layer

use super::RpcError;
use crate::bus::SharedConnection;
use crate::message::{
    Address, CorrelationId, Envelope, Failure, Notification, Properties, Request, Response,
};
use tracing::debug;

/// Answers requests arriving on one service address
///
/// Every request handed to application code must be answered with exactly
/// one of `reply` or `fail`. Both take the request by value, so answering
/// twice does not compile; forgetting to answer leaves the caller waiting
/// with no timeout.
pub struct RequestServer {
    address: Address,
    transport: SharedConnection,
    stopped: bool,
}

impl RequestServer {
    pub fn new(transport: SharedConnection, address: Address) -> Result<Self, RpcError> {
        transport.subscribe(&address)?;
        debug!(%address, "request server listening");
        Ok(Self {
            address,
            transport,
            stopped: false,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Send an `OK` response carrying `properties`
    pub fn reply(&self, request: Request, properties: Properties) -> Result<(), RpcError> {
        self.respond(request, |id| Response::ok(id, properties))
    }

    /// Send a `FAILED` response carrying `failure`
    pub fn fail(&self, request: Request, failure: impl Into<Failure>) -> Result<(), RpcError> {
        let failure = failure.into();
        debug!(address = %self.address, correlation_id = %request.correlation_id, %failure, "failing request");
        self.respond(request, |id| Response::failed(id, failure))
    }

    /// Push an unsolicited notification to `to`
    pub fn notify(&self, to: &Address, properties: Properties) -> Result<(), RpcError> {
        if self.stopped {
            return Err(RpcError::Stopped);
        }
        let notification = Notification {
            from: self.address.clone(),
            properties,
        };
        self.transport
            .send(Envelope::notification(to.clone(), notification))?;
        Ok(())
    }

    /// Stop listening; requests already delivered may still be answered
    /// by nobody
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.transport.unsubscribe(&self.address);
            debug!(address = %self.address, "request server stopped");
        }
    }

    fn respond(
        &self,
        request: Request,
        build: impl FnOnce(CorrelationId) -> Response,
    ) -> Result<(), RpcError> {
        if self.stopped {
            return Err(RpcError::Stopped);
        }
        let Request {
            reply_to,
            correlation_id,
            ..
        } = request;
        self.transport
            .send(Envelope::response(reply_to, build(correlation_id)))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
