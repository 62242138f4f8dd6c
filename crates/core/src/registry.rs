//! Operation registry
//!
//! Concurrent map from [`OperationId`] to the bookkeeping record of an
//! operation that has been accepted but not yet resolved. Records are removed
//! the moment they resolve, so every record present is pending and `len()`
//! is the number of outstanding operations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::types::OperationId;

/// Bookkeeping for one pending operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationRecord {
    /// Operation id
    pub id: OperationId,
    /// When the dispatcher registered the operation
    pub registered_at: Instant,
    /// Number of status fetches issued so far
    pub polls: u32,
}

impl OperationRecord {
    fn new(id: OperationId) -> Self {
        Self {
            id,
            registered_at: Instant::now(),
            polls: 0,
        }
    }

    /// Time since registration
    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }
}

/// Shared registry of pending operations
///
/// Cloning yields another handle to the same map. Each insert and remove is
/// atomic for its entry; no wider transaction is offered.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    records: Arc<DashMap<OperationId, OperationRecord>>,
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly accepted operation
    ///
    /// Returns `false` and leaves the existing record untouched if `id` is
    /// already tracked.
    pub fn insert(&self, id: OperationId) -> bool {
        match self.records.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(OperationRecord::new(id));
                true
            }
        }
    }

    /// Stop tracking an operation, returning its record if it was present
    pub fn remove(&self, id: OperationId) -> Option<OperationRecord> {
        self.records.remove(&id).map(|(_, record)| record)
    }

    /// Whether `id` is still pending
    pub fn contains(&self, id: OperationId) -> bool {
        self.records.contains_key(&id)
    }

    /// Record of a pending operation
    pub fn get(&self, id: OperationId) -> Option<OperationRecord> {
        self.records.get(&id).map(|entry| *entry.value())
    }

    /// Count one more status fetch against `id`
    pub fn record_poll(&self, id: OperationId) {
        if let Some(mut entry) = self.records.get_mut(&id) {
            entry.polls = entry.polls.saturating_add(1);
        }
    }

    /// Number of pending operations
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no operation is pending
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of the pending ids, sorted
    pub fn pending_ids(&self) -> Vec<OperationId> {
        let mut ids: Vec<OperationId> = self.records.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Visit every pending record
    ///
    /// The visitor runs over a snapshot taken before the first call, so it
    /// may freely call [`remove`](Self::remove) or [`insert`](Self::insert)
    /// without holding a shard lock. Records removed by someone else before
    /// they are reached are skipped.
    pub fn for_each_pending<F>(&self, mut visitor: F)
    where
        F: FnMut(&OperationRecord),
    {
        for id in self.pending_ids() {
            if let Some(record) = self.get(id) {
                visitor(&record);
            }
        }
    }
}
