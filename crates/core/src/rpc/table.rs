// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pending-request bookkeeping owned by a single `RequestClient`

use super::RpcError;
use crate::message::CorrelationId;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingState {
    Sent,
    Settled,
}

/// A request that has been sent and not yet answered
#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub correlation_id: CorrelationId,
    /// Caller tag handed back with the outcome
    pub user_context: Option<String>,
    pub created_at: Instant,
    pub state: PendingState,
}

impl PendingRequest {
    pub fn new(
        correlation_id: CorrelationId,
        user_context: Option<String>,
        created_at: Instant,
    ) -> Self {
        Self {
            correlation_id,
            user_context,
            created_at,
            state: PendingState::Sent,
        }
    }
}

/// Maps correlation ids to their pending request
///
/// At most one entry exists per id. Settling removes the entry, so a
/// duplicate or late response finds nothing and is dropped.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    pending: HashMap<CorrelationId, PendingRequest>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            pending: HashMap::new(),
        }
    }

    /// Track a newly sent request
    pub fn insert(&mut self, entry: PendingRequest) -> Result<(), RpcError> {
        if self.pending.contains_key(&entry.correlation_id) {
            return Err(RpcError::DuplicateCorrelation(entry.correlation_id));
        }
        self.pending.insert(entry.correlation_id.clone(), entry);
        Ok(())
    }

    /// Remove and return the entry for `id`, marked settled
    pub fn settle(&mut self, id: &CorrelationId) -> Option<PendingRequest> {
        self.pending.remove(id).map(|mut entry| {
            entry.state = PendingState::Settled;
            entry
        })
    }

    /// Drop the entry for `id` without settling it
    pub fn remove(&mut self, id: &CorrelationId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Drop every entry, returning how many were outstanding
    pub fn clear(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingRequest> {
        self.pending.values()
    }

    /// Ids of entries created before `cutoff`, oldest first
    pub fn created_before(&self, cutoff: Instant) -> Vec<CorrelationId> {
        let mut stale: Vec<&PendingRequest> = self
            .pending
            .values()
            .filter(|entry| entry.created_at < cutoff)
            .collect();
        stale.sort_by_key(|entry| entry.created_at);
        stale
            .into_iter()
            .map(|entry| entry.correlation_id.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod tests;
