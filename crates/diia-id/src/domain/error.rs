//! # Error Taxonomy
//!
//! Typed failures for every workflow entry point, plus the stable
//! `ProcessCode` classification the calling layer renders from.

use crate::domain::pending::OperationKind;
use signing_types::entities::{IdentifierKey, LifecycleState};
use thiserror::Error;

/// Errors that can occur in the DiiaId signing workflows.
///
/// Nothing is swallowed: locally recovered conditions (aborted
/// reservations, recorded revocation errors) still surface to the caller
/// as a typed result.
#[derive(Debug, Clone, Error)]
pub enum SigningError {
    /// The identifier's persisted state does not permit the requested
    /// transition. Not retried; the caller must re-check current state.
    #[error("invalid state transition for {key}: {current} -> {requested}")]
    InvalidStateTransition {
        key: IdentifierKey,
        current: LifecycleState,
        requested: LifecycleState,
    },

    /// Another transition is already reserved for the same key.
    #[error("transition already in progress for {key}")]
    TransitionInProgress { key: IdentifierKey },

    /// The registered operation's deadline elapsed without a response.
    #[error("{kind} operation timed out")]
    Timeout { kind: OperationKind },

    /// The external registry reported a failure.
    #[error("registry error (http {http_code}): {message}")]
    RegistryUnavailable { message: String, http_code: u16 },

    /// The registry could not issue or locate a usable certificate.
    #[error("no valid certificate detected: {0}")]
    NoValidCertificate(String),

    /// Signed content does not match; fatal for the request, never
    /// retried.
    #[error("signed content integrity violated: {0}")]
    IntegrityViolation(String),

    /// No usable identifier exists for the key.
    #[error("no active identifier for {key}")]
    NotFound { key: IdentifierKey },

    /// The correlation registry is shutting down; no new operations are
    /// accepted.
    #[error("correlation registry unavailable (shutting down)")]
    Unavailable,

    /// A response of the wrong kind arrived for a correlation id. The
    /// registry resolves by id, so this indicates a registry-side fault.
    #[error("unexpected {got} reply to {expected} request")]
    UnexpectedReply {
        expected: OperationKind,
        got: OperationKind,
    },

    /// Invalid service configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SigningError {
    /// Stable classification for the calling layer.
    #[must_use]
    pub fn process_code(&self) -> ProcessCode {
        match self {
            Self::TransitionInProgress { .. } => ProcessCode::CreationInProgress,
            Self::InvalidStateTransition { .. } => ProcessCode::InvalidTransition,
            Self::Timeout {
                kind: OperationKind::InitSigning,
            } => ProcessCode::SigningTimedOut,
            Self::Timeout { .. } => ProcessCode::RegistryUnavailable,
            // Client-class registry errors mean the certificate cannot be
            // used; server-class errors mean the registry itself is down.
            Self::RegistryUnavailable { http_code, .. } if (400..500).contains(http_code) => {
                ProcessCode::NoValidCertificate
            }
            Self::RegistryUnavailable { .. } => ProcessCode::RegistryUnavailable,
            Self::NoValidCertificate(_) => ProcessCode::NoValidCertificate,
            Self::IntegrityViolation(_) => ProcessCode::SignedDocumentsIntegrityViolated,
            Self::NotFound { .. } => ProcessCode::IdentifierNotFound,
            Self::Unavailable | Self::InvalidConfig(_) => ProcessCode::ServiceUnavailable,
            Self::UnexpectedReply { .. } => ProcessCode::RegistryUnavailable,
        }
    }
}

/// Deterministic, user-renderable classification of a workflow outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessCode {
    /// Identifier creation is already in flight for this key.
    CreationInProgress,
    /// The identifier's state forbids the requested operation.
    InvalidTransition,
    /// No valid certificate detected for the user.
    NoValidCertificate,
    /// The registry is unavailable.
    RegistryUnavailable,
    /// Signing initiation timed out.
    SigningTimedOut,
    /// Signed documents failed the integrity check.
    SignedDocumentsIntegrityViolated,
    /// No identifier exists for the key.
    IdentifierNotFound,
    /// The service is shutting down or misconfigured.
    ServiceUnavailable,
}
