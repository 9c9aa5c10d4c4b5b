//! Correlation Registry - tracks outstanding asynchronous operations.
//!
//! Maps correlation IDs to pending operations awaiting a registry
//! response. Every operation carries a mandatory deadline; exactly one of
//! {matching response, timeout, cancellation} consumes an entry.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::SigningError;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use signing_types::registry::{
    CertificateCreateResponse, CertificateRevokeResponse, HashFilesResponse,
    IntegrityCheckResponse, InitSigningResponse,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// The kinds of asynchronous registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    HashFiles,
    InitSigning,
    CertificateCreate,
    CertificateRevoke,
    IntegrityCheck,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HashFiles => "hash-files",
            Self::InitSigning => "init-signing",
            Self::CertificateCreate => "certificate-create",
            Self::CertificateRevoke => "certificate-revoke",
            Self::IntegrityCheck => "integrity-check",
        };
        write!(f, "{s}")
    }
}

/// A typed registry response delivered to the waiting operation.
#[derive(Debug, Clone)]
pub enum RegistryReply {
    CertificateCreate(CertificateCreateResponse),
    CertificateRevoke(CertificateRevokeResponse),
    HashFiles(HashFilesResponse),
    InitSigning(InitSigningResponse),
    IntegrityCheck(IntegrityCheckResponse),
}

impl RegistryReply {
    /// The operation kind this reply answers.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CertificateCreate(_) => OperationKind::CertificateCreate,
            Self::CertificateRevoke(_) => OperationKind::CertificateRevoke,
            Self::HashFiles(_) => OperationKind::HashFiles,
            Self::InitSigning(_) => OperationKind::InitSigning,
            Self::IntegrityCheck(_) => OperationKind::IntegrityCheck,
        }
    }
}

/// Outcome delivered through a pending operation's resolver.
pub type OperationOutcome = Result<RegistryReply, SigningError>;

/// A pending operation waiting for its response.
struct PendingOperation {
    /// Single-use continuation.
    sender: oneshot::Sender<OperationOutcome>,
    /// When the operation was registered.
    issued_at: Instant,
    /// Operation kind (for logging and timeout classification).
    kind: OperationKind,
    /// Opaque caller context (identifier key, request tag) for logs.
    context: String,
}

/// Statistics for the correlation registry.
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total operations registered.
    pub total_registered: AtomicU64,
    /// Total operations resolved by a matching response.
    pub total_resolved: AtomicU64,
    /// Total operations that hit their deadline.
    pub total_timeouts: AtomicU64,
    /// Total operations cancelled by the caller.
    pub total_cancelled: AtomicU64,
    /// Total responses dropped (unknown, late, or duplicate id).
    pub total_dropped: AtomicU64,
}

/// Tracks outstanding asynchronous operations by correlation id.
///
/// Flow:
/// 1. The orchestrator calls `register()` and gets a fresh correlation id
///    plus a oneshot receiver
/// 2. The orchestrator publishes the request carrying that id
/// 3. The event dispatcher receives the response and calls `resolve()`
/// 4. The orchestrator awaits the receiver; a per-operation timer fulfills
///    it with `Timeout` if the deadline elapses first
///
/// Removal from the pending map is the linearization point: whichever of
/// resolve, timeout, or cancel removes the entry consumes the operation;
/// the others become no-ops.
pub struct CorrelationRegistry {
    /// Map of correlation id to pending operation.
    pending: DashMap<CorrelationId, PendingOperation>,
    /// Statistics.
    stats: Arc<PendingStats>,
    /// Set during shutdown; new registrations fail fast.
    shutting_down: AtomicBool,
}

impl CorrelationRegistry {
    /// Create a new registry.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: DashMap::new(),
            stats: Arc::new(PendingStats::default()),
            shutting_down: AtomicBool::new(false),
        })
    }

    /// Register a pending operation and get a receiver for its outcome.
    ///
    /// The timeout is mandatory: a per-operation timer fulfills the
    /// receiver with `Timeout` when the deadline elapses unresolved.
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// `Unavailable` when the registry is shutting down.
    pub fn register(
        self: &Arc<Self>,
        kind: OperationKind,
        context: impl Into<String>,
        timeout: Duration,
    ) -> Result<(CorrelationId, oneshot::Receiver<OperationOutcome>), SigningError> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(SigningError::Unavailable);
        }

        let correlation_id = CorrelationId::new();
        let context = context.into();
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            correlation_id,
            PendingOperation {
                sender: tx,
                issued_at: Instant::now(),
                kind,
                context: context.clone(),
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            kind = %kind,
            context = %context,
            timeout_ms = timeout.as_millis(),
            "Registered pending operation"
        );

        // Per-operation deadline timer.
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.expire(correlation_id);
        });

        Ok((correlation_id, rx))
    }

    /// Resolve a pending operation with a registry reply.
    ///
    /// Returns true if the operation was found and resolved. Unknown,
    /// late, or duplicate correlation ids are logged and dropped - never a
    /// caller-visible error, since the bus may deliver duplicates.
    pub fn resolve(&self, correlation_id: CorrelationId, reply: RegistryReply) -> bool {
        let Some((_, op)) = self.pending.remove(&correlation_id) else {
            self.stats.total_dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                correlation_id = %correlation_id,
                kind = %reply.kind(),
                "Response for unknown or already-consumed correlation id, dropping"
            );
            return false;
        };

        let elapsed = op.issued_at.elapsed();
        match op.sender.send(Ok(reply)) {
            Ok(()) => {
                self.stats.total_resolved.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    kind = %op.kind,
                    context = %op.context,
                    elapsed_ms = elapsed.as_millis(),
                    "Resolved pending operation"
                );
                true
            }
            Err(_) => {
                // Receiver was dropped (workflow gave up)
                self.stats.total_dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    kind = %op.kind,
                    "Pending operation receiver dropped"
                );
                false
            }
        }
    }

    /// Cancel a pending operation without resolving its future.
    ///
    /// Used when the orchestrator itself aborts a workflow; a late
    /// external response can no longer resurrect it.
    pub fn cancel(&self, correlation_id: CorrelationId) -> bool {
        if self.pending.remove(&correlation_id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(correlation_id = %correlation_id, "Cancelled pending operation");
            true
        } else {
            false
        }
    }

    /// Refuse new registrations; in-flight operations still resolve or
    /// time out.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    /// Get number of currently pending operations.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Check if a correlation id is pending.
    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    /// Get statistics.
    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    /// Deadline elapsed: fulfill the future with a timeout failure.
    fn expire(&self, correlation_id: CorrelationId) {
        let Some((_, op)) = self.pending.remove(&correlation_id) else {
            // Already resolved or cancelled.
            return;
        };

        self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
        warn!(
            correlation_id = %correlation_id,
            kind = %op.kind,
            context = %op.context,
            elapsed_ms = op.issued_at.elapsed().as_millis(),
            "Pending operation timed out"
        );
        let _ = op.sender.send(Err(SigningError::Timeout { kind: op.kind }));
    }
}
