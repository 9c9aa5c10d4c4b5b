//! Outbound gateway port.
//!
//! The registry is reachable only through fire-and-forget request
//! envelopes; there is no synchronous call path. The orchestrator
//! registers a pending operation first, then hands the allocated
//! correlation id and typed payload to this port.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::SigningError;
use crate::domain::pending::OperationKind;
use async_trait::async_trait;
use signing_types::registry::{
    CertificateCreateRequest, CertificateRevokeRequest, HashFilesRequest, InitSigningParams,
    IntegrityCheckRequest,
};

/// A typed request payload bound for the external registry.
#[derive(Debug, Clone)]
pub enum RegistryRequest {
    CertificateCreate(CertificateCreateRequest),
    CertificateRevoke(CertificateRevokeRequest),
    HashFiles(HashFilesRequest),
    InitSigning(InitSigningParams),
    IntegrityCheck(IntegrityCheckRequest),
}

impl RegistryRequest {
    /// The operation kind this request initiates.
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

/// Publishes request envelopes toward the external registry.
///
/// Publishing succeeds as soon as the envelope is handed to the
/// transport; the answer arrives later through the event dispatcher,
/// tagged with the same correlation id.
#[async_trait]
pub trait ExternalGateway: Send + Sync {
    /// Publish one request envelope carrying the given correlation id.
    ///
    /// # Errors
    ///
    /// `RegistryUnavailable` if the transport cannot accept the envelope.
    async fn publish(
        &self,
        correlation_id: CorrelationId,
        request: RegistryRequest,
    ) -> Result<(), SigningError>;
}
