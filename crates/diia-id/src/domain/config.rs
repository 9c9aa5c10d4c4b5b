//! Service configuration.

use crate::domain::error::SigningError;
use crate::domain::pending::OperationKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-operation deadlines for external round trips.
///
/// Every registered operation carries one of these; an operation without
/// a deadline is rejected by `validate`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Certificate creation round trip.
    pub certificate_create: Duration,
    /// Certificate revocation round trip.
    pub certificate_revoke: Duration,
    /// File hashing round trip.
    pub hash_files: Duration,
    /// Signing initiation round trip.
    pub init_signing: Duration,
    /// Integrity check round trip.
    pub integrity_check: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            certificate_create: Duration::from_secs(30),
            certificate_revoke: Duration::from_secs(30),
            hash_files: Duration::from_secs(20),
            init_signing: Duration::from_secs(60),
            integrity_check: Duration::from_secs(20),
        }
    }
}

impl TimeoutConfig {
    /// The deadline for one operation kind.
    #[must_use]
    pub fn for_kind(&self, kind: OperationKind) -> Duration {
        match kind {
            OperationKind::CertificateCreate => self.certificate_create,
            OperationKind::CertificateRevoke => self.certificate_revoke,
            OperationKind::HashFiles => self.hash_files,
            OperationKind::InitSigning => self.init_signing,
            OperationKind::IntegrityCheck => self.integrity_check,
        }
    }
}

/// Signing service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SigningConfig {
    /// Deadlines for external round trips.
    pub timeouts: TimeoutConfig,
}

impl SigningConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if any operation timeout is zero.
    pub fn validate(&self) -> Result<(), SigningError> {
        const KINDS: [OperationKind; 5] = [
            OperationKind::CertificateCreate,
            OperationKind::CertificateRevoke,
            OperationKind::HashFiles,
            OperationKind::InitSigning,
            OperationKind::IntegrityCheck,
        ];
        for kind in KINDS {
            if self.timeouts.for_kind(kind).is_zero() {
                return Err(SigningError::InvalidConfig(format!(
                    "{kind} timeout must be non-zero"
                )));
            }
        }
        Ok(())
    }
}
