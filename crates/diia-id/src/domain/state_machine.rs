//! Identifier State Machine - legal lifecycle transitions, serialized
//! per identifier key.
//!
//! Reserving a transition takes the key's slot in the reservation table;
//! that slot is the only serialization point in the system and is held
//! across the external round trip so concurrent workflows on the same
//! key cannot both succeed. Unrelated keys transition independently.

use crate::domain::error::SigningError;
use crate::domain::store::IdentifierStore;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use signing_types::entities::{DiiaIdIdentifier, IdentifierKey, LifecycleState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Legal lifecycle transitions.
///
/// `None → Creating → Active → Revoking → Deleted`, with `Failed`
/// reachable from the two in-flight states. Aborting a reservation is
/// not a transition; it reverts to `from` without touching the store.
const VALID_TRANSITIONS: &[(LifecycleState, LifecycleState)] = &[
    (LifecycleState::None, LifecycleState::Creating),
    (LifecycleState::Creating, LifecycleState::Active),
    (LifecycleState::Creating, LifecycleState::Failed),
    (LifecycleState::Active, LifecycleState::Revoking),
    (LifecycleState::Revoking, LifecycleState::Deleted),
    (LifecycleState::Revoking, LifecycleState::Failed),
];

fn is_valid_transition(from: LifecycleState, to: LifecycleState) -> bool {
    VALID_TRANSITIONS.contains(&(from, to))
}

/// An in-flight transition reserved for a key.
struct Reservation {
    from: LifecycleState,
    to: LifecycleState,
}

/// Enforces legal state transitions and per-key mutual exclusion.
///
/// Constructed once and injected; locking is per identifier key only,
/// never global.
pub struct IdentifierStateMachine {
    store: Arc<IdentifierStore>,
    reservations: DashMap<IdentifierKey, Reservation>,
}

impl IdentifierStateMachine {
    /// Create a state machine over the given store.
    #[must_use]
    pub fn new(store: Arc<IdentifierStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            reservations: DashMap::new(),
        })
    }

    /// Reserve the transition `from -> to` for a key.
    ///
    /// # Errors
    ///
    /// - `TransitionInProgress` if another transition is already reserved
    ///   for the same key
    /// - `InvalidStateTransition` if the key's persisted state is not
    ///   `from`, or the transition itself is illegal
    pub fn reserve(
        self: &Arc<Self>,
        key: &IdentifierKey,
        from: LifecycleState,
        to: LifecycleState,
    ) -> Result<TransitionGuard, SigningError> {
        if !is_valid_transition(from, to) {
            return Err(SigningError::InvalidStateTransition {
                key: key.clone(),
                current: from,
                requested: to,
            });
        }

        match self.reservations.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let held = entry.get();
                debug!(
                    key = %key,
                    held_from = %held.from,
                    held_to = %held.to,
                    "Transition slot already reserved"
                );
                Err(SigningError::TransitionInProgress { key: key.clone() })
            }
            Entry::Vacant(slot) => {
                let current = self.store.effective_state(key);
                if current != from {
                    return Err(SigningError::InvalidStateTransition {
                        key: key.clone(),
                        current,
                        requested: to,
                    });
                }

                slot.insert(Reservation { from, to });
                debug!(key = %key, from = %from, to = %to, "Reserved transition");

                Ok(TransitionGuard {
                    machine: Arc::clone(self),
                    key: key.clone(),
                    from,
                    to,
                    released: false,
                })
            }
        }
    }

    /// Number of currently reserved transitions.
    #[must_use]
    pub fn reserved_count(&self) -> usize {
        self.reservations.len()
    }

    fn release(&self, key: &IdentifierKey) {
        self.reservations.remove(key);
    }
}

/// Exclusive hold on one key's transition slot.
///
/// Consumed by exactly one of `commit` or `abort`; dropping an
/// unconsumed guard (cancelled workflow task) releases the slot so the
/// key is not wedged.
pub struct TransitionGuard {
    machine: Arc<IdentifierStateMachine>,
    key: IdentifierKey,
    from: LifecycleState,
    to: LifecycleState,
    released: bool,
}

impl TransitionGuard {
    /// The key this guard serializes.
    #[must_use]
    pub fn key(&self) -> &IdentifierKey {
        &self.key
    }

    /// The reserved target state.
    #[must_use]
    pub fn to(&self) -> LifecycleState {
        self.to
    }

    /// Persist the resulting record and release the key's slot.
    ///
    /// The record's state must be the reserved target or one legal hop
    /// past it: a workflow reserving `Active -> Revoking` commits the
    /// record at `Deleted` after the round trip completes.
    pub fn commit(mut self, record: DiiaIdIdentifier) -> Result<(), SigningError> {
        debug_assert_eq!(record.key(), self.key, "record committed under foreign guard");
        let resulting = record.state;
        if resulting != self.to && !is_valid_transition(self.to, resulting) {
            let err = SigningError::InvalidStateTransition {
                key: self.key.clone(),
                current: self.to,
                requested: resulting,
            };
            self.release();
            return Err(err);
        }

        self.machine.store.upsert(record);
        info!(key = %self.key, from = %self.from, state = %resulting, "Committed transition");
        self.release();
        Ok(())
    }

    /// Revert to `from` and release the key's slot, recording the reason.
    pub fn abort(mut self, reason: &str) {
        info!(
            key = %self.key,
            from = %self.from,
            to = %self.to,
            reason = reason,
            "Aborted transition"
        );
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.machine.release(&self.key);
            self.released = true;
        }
    }
}

impl Drop for TransitionGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!(key = %self.key, "Transition guard dropped without commit or abort");
            self.release();
        }
    }
}
