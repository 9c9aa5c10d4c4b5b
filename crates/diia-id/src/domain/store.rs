//! Identifier Store - durable record of DiiaId identifiers.
//!
//! Concurrent reads of different keys are lock-free; writes to a key are
//! only performed by the state machine while holding that key's
//! transition reservation.

use dashmap::DashMap;
use signing_types::entities::{DiiaIdIdentifier, IdentifierKey, LifecycleState};

/// In-memory keyed store of identifier records.
///
/// Soft-deleted records are retained (with `is_deleted` set) for audit;
/// they no longer count toward the one-live-identifier-per-key invariant.
#[derive(Default)]
pub struct IdentifierStore {
    records: DashMap<IdentifierKey, DiiaIdIdentifier>,
}

impl IdentifierStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record for a key, if any.
    #[must_use]
    pub fn get(&self, key: &IdentifierKey) -> Option<DiiaIdIdentifier> {
        self.records.get(key).map(|r| r.clone())
    }

    /// Insert or replace the record for its key.
    ///
    /// Only the state machine calls this, under the key's transition
    /// reservation.
    pub fn upsert(&self, record: DiiaIdIdentifier) {
        self.records.insert(record.key(), record);
    }

    /// The effective lifecycle state of a key.
    ///
    /// Missing records and terminal records (`Deleted`, `Failed`) report
    /// `None`: a fresh `None -> Creating` reservation is legal for them,
    /// while the terminal record stays readable until overwritten by the
    /// next successful creation.
    #[must_use]
    pub fn effective_state(&self, key: &IdentifierKey) -> LifecycleState {
        match self.records.get(key) {
            Some(record) if !record.state.is_terminal() && !record.is_deleted => record.state,
            _ => LifecycleState::None,
        }
    }

    /// All non-deleted records for a device, across algorithms.
    #[must_use]
    pub fn for_device(&self, user_identifier: &str, mobile_uid: &str) -> Vec<DiiaIdIdentifier> {
        self.records
            .iter()
            .filter(|entry| {
                let r = entry.value();
                r.user_identifier == user_identifier
                    && r.mobile_uid == mobile_uid
                    && !r.is_deleted
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of records, deleted ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
