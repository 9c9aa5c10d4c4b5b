//! # Core Domain Entities
//!
//! Defines the DiiaId identifier record, its lifecycle states, and the
//! file/hash value types that flow through the signing workflows.
//!
//! ## Clusters
//!
//! - **Identity**: `IdentifierKey`, `DiiaIdIdentifier`, `LifecycleState`
//! - **Signing**: `SignAlgo`, `SignType`, `FileToHash`, `HashedFile`,
//!   `SignedFileHash`, `FileIntegrityResult`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Signature algorithm family governing certificate and signature format.
///
/// Modeled as a closed tagged variant and threaded as data through every
/// registry request; workflows never branch on algorithm internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignAlgo {
    /// DSTU 4145 (Ukrainian national standard).
    Dstu,
    /// ECDSA over NIST curves.
    Ecdsa,
}

impl SignAlgo {
    /// All supported algorithms, in registry preference order.
    pub const ALL: [Self; 2] = [Self::Dstu, Self::Ecdsa];
}

impl fmt::Display for SignAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dstu => write!(f, "DSTU"),
            Self::Ecdsa => write!(f, "ECDSA"),
        }
    }
}

/// Key under which at most one non-deleted identifier may exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierKey {
    /// Owning user.
    pub user_identifier: String,
    /// Device the identifier is bound to.
    pub mobile_uid: String,
    /// Signature algorithm family.
    pub sign_algo: SignAlgo,
}

impl IdentifierKey {
    pub fn new(
        user_identifier: impl Into<String>,
        mobile_uid: impl Into<String>,
        sign_algo: SignAlgo,
    ) -> Self {
        Self {
            user_identifier: user_identifier.into(),
            mobile_uid: mobile_uid.into(),
            sign_algo,
        }
    }
}

impl fmt::Display for IdentifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.user_identifier, self.mobile_uid, self.sign_algo
        )
    }
}

/// Lifecycle states of a DiiaId identifier.
///
/// `None → Creating → Active → Revoking → Deleted`, with `Failed`
/// reachable from `Creating` or `Revoking`. `Active` is the only state
/// from which signing operations are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// No identifier exists for the key.
    None,
    /// Certificate creation is in flight.
    Creating,
    /// Identifier is usable for signing.
    Active,
    /// Certificate revocation is in flight.
    Revoking,
    /// Soft-deleted; record retained for audit.
    Deleted,
    /// Terminal failure reported by the registry.
    Failed,
}

impl LifecycleState {
    /// Terminal states admit no further transitions (a new creation
    /// starts over from `None`).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Deleted | Self::Failed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Creating => "creating",
            Self::Active => "active",
            Self::Revoking => "revoking",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Durable record of a user's digital-signature identifier.
///
/// Owned exclusively by the identifier store and mutated only through
/// state-machine transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiiaIdIdentifier {
    /// Opaque registry-issued identifier; assigned only on successful
    /// creation.
    pub identifier: Option<String>,
    /// Owning user.
    pub user_identifier: String,
    /// Device the identifier is bound to.
    pub mobile_uid: String,
    /// Signature algorithm family.
    pub sign_algo: SignAlgo,
    /// Registry-side user identifier correlating the local record to its
    /// remote certificate.
    pub registry_user_identifier: String,
    /// Serial number of the issued certificate.
    pub certificate_serial_number: Option<String>,
    /// When the record was created locally.
    pub creation_date: DateTime<Utc>,
    /// Certificate expiration reported by the registry.
    pub expiration_date: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub state: LifecycleState,
    /// Error reported by the registry during revocation, if any. Kept for
    /// out-of-band reconciliation after a soft delete.
    pub revocation_error: Option<String>,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// When the record was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DiiaIdIdentifier {
    /// Start a new record in `Creating` for the given key.
    #[must_use]
    pub fn creating(key: &IdentifierKey, registry_user_identifier: impl Into<String>) -> Self {
        Self {
            identifier: None,
            user_identifier: key.user_identifier.clone(),
            mobile_uid: key.mobile_uid.clone(),
            sign_algo: key.sign_algo,
            registry_user_identifier: registry_user_identifier.into(),
            certificate_serial_number: None,
            creation_date: Utc::now(),
            expiration_date: None,
            state: LifecycleState::Creating,
            revocation_error: None,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// The key this record lives under.
    #[must_use]
    pub fn key(&self) -> IdentifierKey {
        IdentifierKey::new(
            self.user_identifier.clone(),
            self.mobile_uid.clone(),
            self.sign_algo,
        )
    }

    /// Whether the identifier can be used for signing right now.
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.state == LifecycleState::Active
            && !self.is_deleted
            && self.expiration_date.map_or(true, |exp| exp > now)
    }
}

// =============================================================================
// CLUSTER B: SIGNING
// =============================================================================

/// Signing container type requested from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignType {
    /// Signature embedded in the signed container.
    Attached,
    /// Signature delivered separately from the content.
    Detached,
}

/// A file submitted for hashing, content transported as base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileToHash {
    /// Correlation key within one batched round trip.
    pub name: String,
    /// Base64-encoded file content.
    pub file: String,
    /// Whether the registry should apply an internal signature layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_require_internal_sign: Option<bool>,
}

/// A computed file hash returned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashedFile {
    /// Name matching the request's `FileToHash::name`.
    pub name: String,
    /// Base64-encoded hash value.
    pub hash: String,
}

/// A previously signed file hash submitted for integrity checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedFileHash {
    /// Correlation key within one batched round trip.
    pub name: String,
    /// Base64-encoded hash value.
    pub hash: String,
    /// Base64-encoded signature over the hash.
    pub signature: String,
}

/// Per-file outcome of an integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileIntegrityResult {
    /// Name matching the request's `SignedFileHash::name`.
    pub name: String,
    /// Whether the signature over this file's hash is still valid.
    pub checked: bool,
}
