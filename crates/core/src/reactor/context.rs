// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoints owned by one reactor and the operations handlers call on them

use crate::bus::SharedConnection;
use crate::clock::{Clock, SharedClock};
use crate::id::SharedIdGen;
use crate::lock::{HolderId, LockClient, LockError};
use crate::message::{Address, CorrelationId, Failure, Properties, Request};
use crate::rpc::{RequestClient, RequestServer, RpcError};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Handle to a request client created through [`Context::request_client`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Handle to a request server created through [`Context::serve`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ServerId(u64);

/// Handle to a lock client created through [`Context::lock`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LockId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server-{}", self.0)
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock-{}", self.0)
    }
}

/// Which endpoint owns a bound address
#[derive(Clone, Copy, Debug)]
pub(crate) enum Route {
    Client(ClientId),
    Server(ServerId),
    Lock(LockId),
}

/// Everything a handler can do from inside a callback
///
/// The context owns every endpoint of its reactor. No endpoint is shared
/// between reactors, so two reactors in one process never see each other's
/// pending requests.
pub struct Context {
    transport: SharedConnection,
    pub(crate) ids: SharedIdGen,
    pub(crate) clock: SharedClock,
    next_handle: u64,
    pub(crate) clients: HashMap<ClientId, RequestClient>,
    servers: HashMap<ServerId, RequestServer>,
    pub(crate) locks: HashMap<LockId, LockClient>,
    routes: HashMap<Address, Route>,
    stopped: bool,
}

impl Context {
    pub(crate) fn new(transport: SharedConnection, ids: SharedIdGen, clock: SharedClock) -> Self {
        Self {
            transport,
            ids,
            clock,
            next_handle: 1,
            clients: HashMap::new(),
            servers: HashMap::new(),
            locks: HashMap::new(),
            routes: HashMap::new(),
            stopped: false,
        }
    }

    fn next_handle(&mut self) -> u64 {
        let n = self.next_handle;
        self.next_handle += 1;
        n
    }

    pub(crate) fn route(&self, address: &Address) -> Option<Route> {
        self.routes.get(address).copied()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    // === Endpoint creation ===

    /// Create a client for `service` with its own reply address
    pub fn request_client(&mut self, service: impl Into<Address>) -> Result<ClientId, RpcError> {
        let client = RequestClient::new(
            self.transport.clone(),
            service.into(),
            self.ids.clone(),
            self.clock.clone(),
        )?;
        let id = ClientId(self.next_handle());
        self.routes
            .insert(client.reply_to().clone(), Route::Client(id));
        self.clients.insert(id, client);
        Ok(id)
    }

    /// Listen for requests on `address`
    pub fn serve(&mut self, address: impl Into<Address>) -> Result<ServerId, RpcError> {
        let server = RequestServer::new(self.transport.clone(), address.into())?;
        let id = ServerId(self.next_handle());
        self.routes.insert(server.address().clone(), Route::Server(id));
        self.servers.insert(id, server);
        Ok(id)
    }

    /// Create a client for lock `name`, managed by the service at `lock_service`
    pub fn lock(
        &mut self,
        name: impl Into<String>,
        lock_service: impl Into<Address>,
    ) -> Result<LockId, RpcError> {
        let client = RequestClient::new(
            self.transport.clone(),
            lock_service.into(),
            self.ids.clone(),
            self.clock.clone(),
        )?;
        let holder = HolderId::new(self.ids.next());
        let lock = LockClient::new(name, holder, client);
        let id = LockId(self.next_handle());
        self.routes.insert(lock.notify_address().clone(), Route::Lock(id));
        self.locks.insert(id, lock);
        Ok(id)
    }

    // === Request/response ===

    pub fn request(
        &mut self,
        client: ClientId,
        properties: Properties,
    ) -> Result<CorrelationId, RpcError> {
        self.client_mut(client)?.request(properties, None)
    }

    /// Send a request tagged with `user_context`, handed back with the outcome
    pub fn request_with_context(
        &mut self,
        client: ClientId,
        properties: Properties,
        user_context: impl Into<String>,
    ) -> Result<CorrelationId, RpcError> {
        self.client_mut(client)?
            .request(properties, Some(user_context.into()))
    }

    /// Forget a pending request; its response, if any, is dropped
    pub fn abandon(&mut self, client: ClientId, correlation_id: &CorrelationId) -> bool {
        self.clients
            .get_mut(&client)
            .is_some_and(|c| c.abandon(correlation_id))
    }

    pub fn reply(
        &mut self,
        server: ServerId,
        request: Request,
        properties: Properties,
    ) -> Result<(), RpcError> {
        self.server(server)?.reply(request, properties)
    }

    pub fn fail(
        &mut self,
        server: ServerId,
        request: Request,
        failure: impl Into<Failure>,
    ) -> Result<(), RpcError> {
        self.server(server)?.fail(request, failure)
    }

    /// Push an unsolicited notification from `server` to `to`
    pub fn notify(
        &mut self,
        server: ServerId,
        to: &Address,
        properties: Properties,
    ) -> Result<(), RpcError> {
        self.server(server)?.notify(to, properties)
    }

    pub fn client(&self, client: ClientId) -> Option<&RequestClient> {
        self.clients.get(&client)
    }

    pub fn stop_client(&mut self, client: ClientId) {
        if let Some(c) = self.clients.get_mut(&client) {
            self.routes.remove(c.reply_to());
            c.stop();
        }
    }

    pub fn stop_server(&mut self, server: ServerId) {
        if let Some(s) = self.servers.get_mut(&server) {
            self.routes.remove(s.address());
            s.stop();
        }
    }

    // === Locks ===

    pub fn acquire(&mut self, lock: LockId) -> Result<(), LockError> {
        self.lock_mut(lock)?.acquire()
    }

    pub fn release(&mut self, lock: LockId) -> Result<(), LockError> {
        self.lock_mut(lock)?.release()
    }

    pub fn destroy(&mut self, lock: LockId) -> Result<(), LockError> {
        self.lock_mut(lock)?.destroy()
    }

    /// Return a failed lock to idle so it can be acquired again
    pub fn rearm(&mut self, lock: LockId) -> Result<(), LockError> {
        self.lock_mut(lock)?.rearm()
    }

    pub fn lock_client(&self, lock: LockId) -> Option<&LockClient> {
        self.locks.get(&lock)
    }

    // === Lifecycle ===

    /// Stop every endpoint, close the connection and end the reactor loop
    ///
    /// Pending requests are dropped without callbacks. Locks still held stay
    /// held at the service.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        for client in self.clients.values_mut() {
            client.stop();
        }
        for server in self.servers.values_mut() {
            server.stop();
        }
        for lock in self.locks.values_mut() {
            lock.stop();
        }
        self.routes.clear();
        self.transport.close();
        info!(
            clients = self.clients.len(),
            servers = self.servers.len(),
            locks = self.locks.len(),
            "reactor stopped"
        );
    }

    fn client_mut(&mut self, client: ClientId) -> Result<&mut RequestClient, RpcError> {
        self.clients
            .get_mut(&client)
            .ok_or_else(|| RpcError::UnknownEndpoint(client.to_string()))
    }

    fn server(&self, server: ServerId) -> Result<&RequestServer, RpcError> {
        self.servers
            .get(&server)
            .ok_or_else(|| RpcError::UnknownEndpoint(server.to_string()))
    }

    fn lock_mut(&mut self, lock: LockId) -> Result<&mut LockClient, LockError> {
        match self.locks.get_mut(&lock) {
            Some(l) => Ok(l),
            None => {
                debug!(%lock, "unknown lock handle");
                Err(LockError::Rpc(RpcError::UnknownEndpoint(lock.to_string())))
            }
        }
    }
}
