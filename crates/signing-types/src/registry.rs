//! # External Registry Wire Payloads
//!
//! Field-exact request/response payloads for the five asynchronous
//! exchanges with the external signing registry.
//!
//! ## Design Rules
//!
//! - Every response may carry `error { message, http_code }`; consumers
//!   MUST check it before trusting `response`.
//! - Request/response matching uses the bus envelope's correlation id;
//!   where the registry echoes a `uuid` field it carries the same value.

use crate::entities::{FileIntegrityResult, FileToHash, HashedFile, SignAlgo, SignType, SignedFileHash};
use serde::{Deserialize, Serialize};

/// Canonical external failure shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryError {
    /// Human-readable registry message.
    pub message: String,
    /// HTTP-style status code classifying the failure.
    pub http_code: u16,
}

// =============================================================================
// EXCHANGE 1: CERTIFICATE CREATE
// =============================================================================

/// Request certificate issuance for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateCreateRequest {
    /// The user identifier the certificate is issued for.
    pub identifier: String,
    /// Registry-side user identifier.
    pub registry_user_identifier: String,
    /// Previous certificate serial, when re-issuing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_serial_number: Option<String>,
}

/// Successful certificate creation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateCreateData {
    /// The issued DiiaId identifier.
    pub identifier: String,
    /// Whether issuance succeeded.
    pub success: bool,
    /// Serial number of the issued certificate.
    pub certificate_serial_number: String,
    /// Certificate expiration (RFC 3339).
    pub expiration_date: String,
}

/// Response to a certificate creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateCreateResponse {
    /// Echo of the caller-supplied correlation uuid.
    pub uuid: String,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<CertificateCreateData>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RegistryError>,
}

// =============================================================================
// EXCHANGE 2: CERTIFICATE REVOKE
// =============================================================================

/// Request certificate revocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRevokeRequest {
    /// The DiiaId identifier being revoked.
    pub identifier: String,
    /// Registry-side user identifier.
    pub registry_user_identifier: String,
}

/// Revocation outcome data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRevokeData {
    /// Whether revocation succeeded.
    pub success: bool,
    /// Registry-side revocation error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to a certificate revocation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRevokeResponse {
    /// Echo of the caller-supplied correlation uuid.
    pub uuid: String,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<CertificateRevokeData>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RegistryError>,
}

// =============================================================================
// EXCHANGE 3: HASH FILES
// =============================================================================

/// Request hashing of a batched file set.
///
/// The full file set travels in one request; per-file matching within the
/// round trip is by `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashFilesRequest {
    /// The DiiaId identifier performing the signing.
    pub identifier: String,
    /// Registry-side user identifier.
    pub registry_user_identifier: String,
    /// Certificate serial the hashes will be signed under.
    pub certificate_serial_number: String,
    /// Files to hash.
    pub files: Vec<FileToHash>,
    /// Signature algorithm family.
    pub sign_algo: SignAlgo,
}

/// Response carrying computed hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashFilesResponse {
    /// The DiiaId identifier the hashes were computed for.
    pub identifier: String,
    /// One entry per requested file, matched by name.
    pub hashes: Vec<HashedFile>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RegistryError>,
}

// =============================================================================
// EXCHANGE 4: SIGN HASHES INIT
// =============================================================================

/// Parameters of a signing initiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSigningParams {
    /// The DiiaId identifier performing the signing.
    pub identifier: String,
    /// Certificate serial the hashes are signed under.
    pub certificate_serial_number: String,
    /// Registry-side user identifier.
    pub registry_user_identifier: String,
    /// Signing container type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_type: Option<SignType>,
    /// Omit the signing-time attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_signing_time: Option<bool>,
    /// Omit the content-timestamp attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_content_timestamp: Option<bool>,
}

/// Request initiation of signing over previously computed hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSigningRequest {
    /// Caller-supplied correlation uuid, echoed in the response.
    pub uuid: String,
    /// Signing parameters.
    pub request: InitSigningParams,
}

/// Successful signing initiation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSigningData {
    /// The DiiaId identifier the signing was initiated for.
    pub identifier: String,
    /// Whether initiation succeeded.
    pub success: bool,
}

/// Response to a signing initiation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitSigningResponse {
    /// Echo of the caller-supplied correlation uuid.
    pub uuid: String,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<InitSigningData>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RegistryError>,
}

// =============================================================================
// EXCHANGE 5: INTEGRITY CHECK
// =============================================================================

/// Request validation of previously issued signatures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityCheckRequest {
    /// The DiiaId identifier whose signatures are checked.
    pub identifier: String,
    /// Registry-side user identifier.
    pub registry_user_identifier: String,
    /// Certificate serial the signatures were issued under.
    pub certificate_serial_number: String,
    /// Signed file hashes to verify.
    pub files: Vec<SignedFileHash>,
    /// Ask the registry to return original content alongside results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_originals: Option<bool>,
}

/// Response carrying per-file integrity results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityCheckResponse {
    /// The DiiaId identifier the check ran for.
    pub identifier: String,
    /// One entry per requested file, matched by name.
    pub check_results: Vec<FileIntegrityResult>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RegistryError>,
}
