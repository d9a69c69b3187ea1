// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires the lock service, the value store and the increment clients onto
//! one in-memory bus and runs them to completion

use crate::config::{ConfigError, DemoConfig};
use crate::increment::{IncrementClient, IncrementOutcome};
use crate::value_store::ValueStore;
use sp_core::{Address, Handler, InMemoryBus, LockService, LockStats, Reactor};
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

#[derive(Debug, Error)]
pub enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0} failed to start")]
    Startup(Address),

    #[error("participant task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What a demo run produced
#[derive(Clone, Debug)]
pub struct DemoReport {
    pub final_value: i64,
    /// One entry per increment client, in spawn order
    pub outcomes: Vec<IncrementOutcome>,
    /// Lock service counters after every client stopped
    pub locks: LockStats,
}

impl DemoReport {
    pub fn increments(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, IncrementOutcome::Incremented(_)))
            .count()
    }

    pub fn failures(&self) -> usize {
        self.outcomes.len() - self.increments()
    }
}

/// Run one demo to completion
///
/// Services are bound before any client starts, so no client request can
/// race ahead of the address it targets.
pub async fn run(config: &DemoConfig) -> Result<DemoReport, DemoError> {
    config.validate()?;
    info!(
        bus = %config.bus_address,
        service = %config.service_address,
        lock = %config.lock_name,
        clients = config.clients,
        "starting demo"
    );

    let bus = InMemoryBus::new();
    let lock_service = Address::new(config.lock_service_address.as_str());
    let service = Address::new(config.service_address.as_str());

    let mut locks = Reactor::new(
        bus.connect(),
        LockService::new(lock_service.clone(), config.locks.clone()),
    );
    locks.start();
    if locks.is_stopped() {
        return Err(DemoError::Startup(lock_service));
    }
    let mut store = Reactor::new(bus.connect(), ValueStore::new(service.clone()));
    store.start();
    if store.is_stopped() {
        return Err(DemoError::Startup(service));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let locks_task = tokio::spawn(serve(locks, shutdown_rx.clone()));
    let store_task = tokio::spawn(serve(store, shutdown_rx));

    let clients: Vec<_> = (0..config.clients)
        .map(|_| {
            let mut reactor = Reactor::new(
                bus.connect(),
                IncrementClient::new(
                    service.clone(),
                    lock_service.clone(),
                    config.lock_name.clone(),
                ),
            );
            tokio::spawn(async move {
                reactor.run().await;
                reactor.handler().outcome().clone()
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(clients.len());
    for client in clients {
        outcomes.push(client.await?);
    }

    let _ = shutdown_tx.send(true);
    let locks = locks_task.await?;
    let store = store_task.await?;

    let report = DemoReport {
        final_value: store.handler().value(),
        outcomes,
        locks: locks.handler().stats(),
    };
    info!(
        final_value = report.final_value,
        increments = report.increments(),
        failures = report.failures(),
        "demo finished"
    );
    Ok(report)
}

/// Run a service reactor until it stops or shutdown is signalled
async fn serve<H>(mut reactor: Reactor<H>, mut shutdown: watch::Receiver<bool>) -> Reactor<H>
where
    H: Handler + Send + 'static,
{
    tokio::select! {
        _ = reactor.run() => {}
        _ = shutdown.changed() => {}
    }
    reactor
}

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod tests;
