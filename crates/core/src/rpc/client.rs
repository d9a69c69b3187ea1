// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the correlation layer

use super::table::{CorrelationTable, PendingRequest};
use super::RpcError;
use crate::bus::SharedConnection;
use crate::clock::SharedClock;
use crate::id::SharedIdGen;
use crate::message::{
    Address, CorrelationId, Envelope, Failure, Outcome, Properties, Request, Response,
};
use tracing::{debug, warn};

/// Successful response, routed back to the request that caused it
#[derive(Clone, Debug, PartialEq)]
pub struct Reply {
    pub correlation_id: CorrelationId,
    pub properties: Properties,
    pub user_context: Option<String>,
}

/// Failed response, routed back to the request that caused it
#[derive(Clone, Debug, PartialEq)]
pub struct RequestFailed {
    pub correlation_id: CorrelationId,
    pub failure: Failure,
    pub user_context: Option<String>,
}

/// Outcome of settling one pending request
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    Response(Reply),
    Failed(RequestFailed),
}

/// Issues correlated requests to a single service address
///
/// Each client binds a private reply address at construction and asks the
/// transport to report when the service address has a subscriber; until
/// then `is_ready()` is false and requests are likely to be unroutable.
/// `request()`
/// never waits: the outcome comes back later through `handle_response()`,
/// which the owning reactor feeds with whatever arrives on the reply address.
pub struct RequestClient {
    service: Address,
    reply_to: Address,
    transport: SharedConnection,
    ids: SharedIdGen,
    clock: SharedClock,
    table: CorrelationTable,
    ready: bool,
    stopped: bool,
}

impl RequestClient {
    pub fn new(
        transport: SharedConnection,
        service: Address,
        ids: SharedIdGen,
        clock: SharedClock,
    ) -> Result<Self, RpcError> {
        let reply_to = Address::reply_for(&service, &ids.next());
        transport.subscribe(&reply_to)?;
        transport.watch(&service, &reply_to)?;
        debug!(%service, %reply_to, "request client created");
        Ok(Self {
            service,
            reply_to,
            transport,
            ids,
            clock,
            table: CorrelationTable::new(),
            ready: false,
            stopped: false,
        })
    }

    pub fn service(&self) -> &Address {
        &self.service
    }

    /// Address responses and notifications for this client arrive on
    pub fn reply_to(&self) -> &Address {
        &self.reply_to
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether the service address has been reported reachable
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn pending_count(&self) -> usize {
        self.table.len()
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingRequest> {
        self.table.iter()
    }

    pub fn table(&self) -> &CorrelationTable {
        &self.table
    }

    /// Send `properties` to the service under a fresh correlation id
    ///
    /// Returns as soon as the request is handed to the transport. A send
    /// failure is reported here and leaves nothing pending.
    pub fn request(
        &mut self,
        properties: Properties,
        user_context: Option<String>,
    ) -> Result<CorrelationId, RpcError> {
        if self.stopped {
            return Err(RpcError::Stopped);
        }

        let correlation_id = CorrelationId::new(self.ids.next());
        self.table.insert(PendingRequest::new(
            correlation_id.clone(),
            user_context,
            self.clock.now(),
        ))?;

        let request = Request {
            address: self.service.clone(),
            reply_to: self.reply_to.clone(),
            correlation_id: correlation_id.clone(),
            properties,
        };
        if let Err(e) = self.transport.send(Envelope::request(request)) {
            self.table.remove(&correlation_id);
            return Err(e.into());
        }

        debug!(service = %self.service, %correlation_id, "request sent");
        Ok(correlation_id)
    }

    /// Settle the pending request a response belongs to
    ///
    /// Responses for unknown ids (already settled, abandoned, or never
    /// issued) are dropped and yield `None`.
    pub fn handle_response(&mut self, response: Response) -> Option<ClientEvent> {
        if self.stopped {
            debug!(correlation_id = %response.correlation_id, "client stopped, dropping response");
            return None;
        }

        let Some(entry) = self.table.settle(&response.correlation_id) else {
            debug!(correlation_id = %response.correlation_id, "dropping orphaned response");
            return None;
        };

        let event = match response.outcome {
            Outcome::Ok { properties } => ClientEvent::Response(Reply {
                correlation_id: entry.correlation_id,
                properties,
                user_context: entry.user_context,
            }),
            Outcome::Failed { failure } => {
                debug!(correlation_id = %entry.correlation_id, %failure, "request failed");
                ClientEvent::Failed(RequestFailed {
                    correlation_id: entry.correlation_id,
                    failure,
                    user_context: entry.user_context,
                })
            }
        };
        Some(event)
    }

    /// Record that the service became reachable
    ///
    /// Returns true the first time only; repeats and signals after `stop()`
    /// are ignored.
    pub fn handle_ready(&mut self, service: &Address) -> bool {
        if self.stopped || self.ready || *service != self.service {
            return false;
        }
        self.ready = true;
        debug!(service = %self.service, "service ready");
        true
    }

    /// Forget one pending request; a later response for it is ignored
    pub fn abandon(&mut self, correlation_id: &CorrelationId) -> bool {
        self.table.remove(correlation_id)
    }

    /// Stop accepting requests and release the reply address
    ///
    /// Outstanding requests are discarded without a callback and no
    /// cancellation is sent to the service.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let discarded = self.table.clear();
        self.transport.unsubscribe(&self.reply_to);
        if discarded > 0 {
            warn!(service = %self.service, discarded, "request client stopped with requests outstanding");
        } else {
            debug!(service = %self.service, "request client stopped");
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
