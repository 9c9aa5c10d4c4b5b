//! # Registry Events
//!
//! Defines all envelopes that flow through the signing bus. Payload
//! shapes live in `signing-types/src/registry.rs`; the envelope adds the
//! caller-supplied correlation id used to match a response to its
//! originating request.

use serde::{Deserialize, Serialize};
use signing_types::registry::{
    CertificateCreateRequest, CertificateCreateResponse, CertificateRevokeRequest,
    CertificateRevokeResponse, HashFilesRequest, HashFilesResponse, IntegrityCheckRequest,
    IntegrityCheckResponse, InitSigningRequest, InitSigningResponse,
};

/// All envelopes that can be published to the signing bus.
///
/// Request variants travel outbound to the registry; response variants
/// travel inbound and are consumed by exactly one pending operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegistryEvent {
    // =========================================================================
    // OUTBOUND REQUESTS
    // =========================================================================
    /// Request certificate issuance.
    CertificateCreateRequested {
        correlation_id: String,
        payload: CertificateCreateRequest,
    },

    /// Request certificate revocation.
    CertificateRevokeRequested {
        correlation_id: String,
        payload: CertificateRevokeRequest,
    },

    /// Request hashing of a batched file set.
    HashFilesRequested {
        correlation_id: String,
        payload: HashFilesRequest,
    },

    /// Request initiation of signing over computed hashes.
    InitSigningRequested {
        correlation_id: String,
        payload: InitSigningRequest,
    },

    /// Request validation of previously issued signatures.
    IntegrityCheckRequested {
        correlation_id: String,
        payload: IntegrityCheckRequest,
    },

    // =========================================================================
    // INBOUND RESPONSES
    // =========================================================================
    /// Certificate issuance outcome.
    CertificateCreated {
        correlation_id: String,
        payload: CertificateCreateResponse,
    },

    /// Certificate revocation outcome.
    CertificateRevoked {
        correlation_id: String,
        payload: CertificateRevokeResponse,
    },

    /// Computed hashes for a batched file set.
    FilesHashed {
        correlation_id: String,
        payload: HashFilesResponse,
    },

    /// Signing initiation outcome.
    SigningInitiated {
        correlation_id: String,
        payload: InitSigningResponse,
    },

    /// Per-file integrity check results.
    IntegrityChecked {
        correlation_id: String,
        payload: IntegrityCheckResponse,
    },
}

impl RegistryEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::CertificateCreateRequested { .. }
            | Self::CertificateRevokeRequested { .. }
            | Self::CertificateCreated { .. }
            | Self::CertificateRevoked { .. } => EventTopic::Certificates,
            Self::HashFilesRequested { .. } | Self::FilesHashed { .. } => EventTopic::Hashing,
            Self::InitSigningRequested { .. } | Self::SigningInitiated { .. } => {
                EventTopic::Signing
            }
            Self::IntegrityCheckRequested { .. } | Self::IntegrityChecked { .. } => {
                EventTopic::Integrity
            }
        }
    }

    /// Whether this envelope travels toward or from the registry.
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Self::CertificateCreateRequested { .. }
            | Self::CertificateRevokeRequested { .. }
            | Self::HashFilesRequested { .. }
            | Self::InitSigningRequested { .. }
            | Self::IntegrityCheckRequested { .. } => Direction::Request,
            Self::CertificateCreated { .. }
            | Self::CertificateRevoked { .. }
            | Self::FilesHashed { .. }
            | Self::SigningInitiated { .. }
            | Self::IntegrityChecked { .. } => Direction::Response,
        }
    }

    /// The correlation id carried by this envelope.
    #[must_use]
    pub fn correlation_id(&self) -> &str {
        match self {
            Self::CertificateCreateRequested { correlation_id, .. }
            | Self::CertificateRevokeRequested { correlation_id, .. }
            | Self::HashFilesRequested { correlation_id, .. }
            | Self::InitSigningRequested { correlation_id, .. }
            | Self::IntegrityCheckRequested { correlation_id, .. }
            | Self::CertificateCreated { correlation_id, .. }
            | Self::CertificateRevoked { correlation_id, .. }
            | Self::FilesHashed { correlation_id, .. }
            | Self::SigningInitiated { correlation_id, .. }
            | Self::IntegrityChecked { correlation_id, .. } => correlation_id,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Certificate issuance and revocation exchanges.
    Certificates,
    /// File hashing exchange.
    Hashing,
    /// Signing initiation exchange.
    Signing,
    /// Signature integrity exchange.
    Integrity,
    /// All events (no filtering).
    All,
}

/// Direction of an envelope relative to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Outbound, toward the registry.
    Request,
    /// Inbound, from the registry.
    Response,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Directions to include. Empty means both.
    pub directions: Vec<Direction>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            directions: Vec::new(),
        }
    }

    /// Create a filter for one direction across all topics.
    #[must_use]
    pub fn direction(direction: Direction) -> Self {
        Self {
            topics: Vec::new(),
            directions: vec![direction],
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RegistryEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let direction_match =
            self.directions.is_empty() || self.directions.contains(&event.direction());

        topic_match && direction_match
    }
}
