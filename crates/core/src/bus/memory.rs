// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process bus routing envelopes between connections by address

use super::{BusConnection, BusError, Connection, Inbox, InboxSender};
use crate::message::{Address, Envelope};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::mpsc;
use tracing::{debug, trace};

struct Route {
    connection: u64,
    tx: InboxSender,
}

/// The in-memory bus routes envelopes to whichever connection bound the
/// destination address
pub struct InMemoryBus {
    routes: Arc<RwLock<HashMap<Address, Route>>>,
    /// Optional observer that sees every routed envelope
    tap: Arc<RwLock<Option<InboxSender>>>,
    /// Addresses waiting to hear that a service address got bound
    watchers: Arc<Mutex<HashMap<Address, Vec<Address>>>>,
    next_connection: Arc<AtomicU64>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            tap: Arc::new(RwLock::new(None)),
            watchers: Arc::new(Mutex::new(HashMap::new())),
            next_connection: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Open a new connection with its own inbox
    pub fn connect(&self) -> Connection {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_connection.fetch_add(1, Ordering::SeqCst);
        debug!(connection = id, "bus connection opened");
        let transport = InMemoryConnection {
            id,
            bus: self.clone(),
            tx: Mutex::new(Some(tx)),
            bound: Mutex::new(HashSet::new()),
            closed: AtomicBool::new(false),
        };
        Connection::new(Arc::new(transport), rx)
    }

    /// Receive a copy of every envelope that is successfully routed
    pub fn set_tap(&self) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tap = self.tap.write().unwrap_or_else(|e| e.into_inner());
        *tap = Some(tx);
        rx
    }

    /// Whether any connection currently binds `address`
    pub fn is_bound(&self, address: &Address) -> bool {
        self.routes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(address)
    }

    /// Number of bound addresses across all connections
    pub fn route_count(&self) -> usize {
        self.routes.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn bind(&self, address: &Address, connection: u64, tx: InboxSender) -> Result<(), BusError> {
        {
            let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
            if let Some(route) = routes.get(address) {
                if route.connection != connection {
                    return Err(BusError::AddressInUse(address.clone()));
                }
            }
            routes.insert(address.clone(), Route { connection, tx });
        }

        let waiting = self
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(address)
            .unwrap_or_default();
        for notify in waiting {
            self.announce(address, notify);
        }
        Ok(())
    }

    fn watch(&self, service: &Address, notify: &Address) {
        // Bound check under the watcher lock; bind drains watchers after inserting
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_bound(service) {
            drop(watchers);
            self.announce(service, notify.clone());
        } else {
            debug!(%service, %notify, "waiting for service to bind");
            watchers
                .entry(service.clone())
                .or_default()
                .push(notify.clone());
        }
    }

    fn announce(&self, service: &Address, notify: Address) {
        if let Err(e) = self.route(Envelope::ready(notify, service.clone())) {
            debug!(%service, error = %e, "watcher gone, dropping ready signal");
        }
    }

    fn unbind(&self, address: &Address, connection: u64) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        if routes
            .get(address)
            .is_some_and(|route| route.connection == connection)
        {
            routes.remove(address);
        }
    }

    fn route(&self, envelope: Envelope) -> Result<(), BusError> {
        let routes = self.routes.read().unwrap_or_else(|e| e.into_inner());
        let Some(route) = routes.get(&envelope.to) else {
            return Err(BusError::Unroutable(envelope.to));
        };

        if let Some(tap) = self
            .tap
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            let _ = tap.send(envelope.clone());
        }

        trace!(to = %envelope.to, kind = envelope.message.kind(), "routing envelope");
        let to = envelope.to.clone();
        route.tx.send(envelope).map_err(|_| BusError::Unroutable(to))
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for InMemoryBus {
    fn clone(&self) -> Self {
        Self {
            routes: Arc::clone(&self.routes),
            tap: Arc::clone(&self.tap),
            watchers: Arc::clone(&self.watchers),
            next_connection: Arc::clone(&self.next_connection),
        }
    }
}

/// One participant's handle on an [`InMemoryBus`]
pub struct InMemoryConnection {
    id: u64,
    bus: InMemoryBus,
    tx: Mutex<Option<InboxSender>>,
    bound: Mutex<HashSet<Address>>,
    closed: AtomicBool,
}

impl BusConnection for InMemoryConnection {
    fn subscribe(&self, address: &Address) -> Result<(), BusError> {
        let tx = self
            .tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(BusError::Closed)?;
        self.bus.bind(address, self.id, tx)?;
        self.bound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.clone());
        debug!(connection = self.id, %address, "address bound");
        Ok(())
    }

    fn unsubscribe(&self, address: &Address) {
        self.bus.unbind(address, self.id);
        self.bound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(address);
    }

    fn send(&self, envelope: Envelope) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        self.bus.route(envelope)
    }

    fn watch(&self, service: &Address, notify: &Address) -> Result<(), BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        self.bus.watch(service, notify);
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let bound: Vec<Address> = self
            .bound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .collect();
        for address in &bound {
            self.bus.unbind(address, self.id);
        }
        // Dropping the last sender lets the inbox report end-of-stream
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        debug!(connection = self.id, released = bound.len(), "bus connection closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
