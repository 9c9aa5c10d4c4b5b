//! The signing orchestrator: composes the state machine, correlation
//! registry, and outbound gateway into the public workflows.
//!
//! Every workflow is a short sequential pipeline of awaited external
//! round trips. Each round trip is a suspension point; no lock is held
//! across unrelated identifiers, only the per-key transition reservation
//! taken at the start of a lifecycle workflow.

use crate::domain::config::SigningConfig;
use crate::domain::error::SigningError;
use crate::domain::hashing;
use crate::domain::pending::{CorrelationRegistry, OperationKind, RegistryReply};
use crate::domain::state_machine::IdentifierStateMachine;
use crate::domain::store::IdentifierStore;
use crate::ports::gateway::{ExternalGateway, RegistryRequest};
use chrono::{DateTime, Utc};
use signing_types::entities::{
    DiiaIdIdentifier, FileIntegrityResult, FileToHash, HashedFile, IdentifierKey, LifecycleState,
    SignAlgo, SignType, SignedFileHash,
};
use signing_types::registry::{
    CertificateCreateRequest, CertificateRevokeRequest, HashFilesRequest, InitSigningParams,
    IntegrityCheckRequest,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of an identifier creation request.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// A new identifier was issued and is now active.
    Created(DiiaIdIdentifier),
    /// Another creation for the same key is already in flight; not an
    /// error, the caller polls for the result.
    CreationInProgress,
}

/// Optional flags for a signing initiation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigningOptions {
    /// Signing container type.
    pub sign_type: Option<SignType>,
    /// Omit the signing-time attribute.
    pub no_signing_time: Option<bool>,
    /// Omit the content-timestamp attribute.
    pub no_content_timestamp: Option<bool>,
}

/// Aggregated outcome of a signature integrity check.
#[derive(Debug, Clone)]
pub struct SignatureValidation {
    /// True only if every file's signature checked out.
    pub is_valid: bool,
    /// Names of the files that failed, in request order.
    pub failing_files: Vec<String>,
    /// Per-file verdicts, in request order.
    pub results: Vec<FileIntegrityResult>,
}

/// Drives the DiiaId lifecycle and signing workflows.
pub struct SigningOrchestrator {
    store: Arc<IdentifierStore>,
    state_machine: Arc<IdentifierStateMachine>,
    registry: Arc<CorrelationRegistry>,
    gateway: Arc<dyn ExternalGateway>,
    config: SigningConfig,
}

impl SigningOrchestrator {
    /// Create an orchestrator over the given collaborators.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the configuration fails validation.
    pub fn new(
        store: Arc<IdentifierStore>,
        state_machine: Arc<IdentifierStateMachine>,
        registry: Arc<CorrelationRegistry>,
        gateway: Arc<dyn ExternalGateway>,
        config: SigningConfig,
    ) -> Result<Self, SigningError> {
        config.validate()?;
        Ok(Self {
            store,
            state_machine,
            registry,
            gateway,
            config,
        })
    }

    // =========================================================================
    // LIFECYCLE WORKFLOWS
    // =========================================================================

    /// Create a DiiaId identifier for a user and device.
    ///
    /// Reserves `None -> Creating`, requests certificate issuance, and on
    /// success commits the record as `Active`. A concurrent creation for
    /// the same key yields `CreationInProgress` instead of an error; any
    /// registry failure aborts the reservation back to `None`.
    pub async fn create_identifier(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
        process_id: &str,
    ) -> Result<CreateOutcome, SigningError> {
        let key = IdentifierKey::new(user_identifier, mobile_uid, sign_algo);

        let guard =
            match self
                .state_machine
                .reserve(&key, LifecycleState::None, LifecycleState::Creating)
            {
                Ok(guard) => guard,
                Err(SigningError::TransitionInProgress { .. }) => {
                    info!(key = %key, "Creation already in flight");
                    return Ok(CreateOutcome::CreationInProgress);
                }
                Err(err) => return Err(err),
            };

        // Carry the previous serial when re-issuing after a delete.
        let previous_serial = self
            .store
            .get(&key)
            .and_then(|r| r.certificate_serial_number);

        let request = RegistryRequest::CertificateCreate(CertificateCreateRequest {
            identifier: user_identifier.to_string(),
            registry_user_identifier: process_id.to_string(),
            certificate_serial_number: previous_serial,
        });

        let reply = match self.round_trip(&key.to_string(), request).await {
            Ok(reply) => reply,
            Err(err) => {
                guard.abort(&err.to_string());
                return Err(err);
            }
        };

        let response = match expect_certificate_create(reply) {
            Ok(response) => response,
            Err(err) => {
                guard.abort(&err.to_string());
                return Err(err);
            }
        };

        if let Some(err) = response.error {
            let err = SigningError::RegistryUnavailable {
                message: err.message,
                http_code: err.http_code,
            };
            guard.abort(&err.to_string());
            return Err(err);
        }

        let data = match response.response {
            Some(data) if data.success => data,
            _ => {
                let err =
                    SigningError::NoValidCertificate("registry declined certificate issuance".into());
                guard.abort(&err.to_string());
                return Err(err);
            }
        };

        let mut record = DiiaIdIdentifier::creating(&key, process_id);
        record.identifier = Some(data.identifier);
        record.certificate_serial_number = Some(data.certificate_serial_number);
        record.expiration_date = parse_expiration(&key, &data.expiration_date);
        record.state = LifecycleState::Active;

        guard.commit(record.clone())?;
        info!(key = %key, "Identifier created");
        Ok(CreateOutcome::Created(record))
    }

    /// Soft-delete every active identifier for a user and device.
    ///
    /// Each record goes through its own `Active -> Revoking -> Deleted`
    /// transition. The delete proceeds even when remote revocation fails
    /// or times out: the local identifier must stop being usable, and the
    /// unconfirmed remote state is recorded as `revocation_error` for
    /// out-of-band reconciliation.
    pub async fn delete_identifier(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
    ) -> Result<Vec<DiiaIdIdentifier>, SigningError> {
        let active: Vec<DiiaIdIdentifier> = self
            .store
            .for_device(user_identifier, mobile_uid)
            .into_iter()
            .filter(|r| r.state == LifecycleState::Active)
            .collect();

        let mut deleted = Vec::with_capacity(active.len());
        for record in active {
            deleted.push(self.revoke_and_delete(record).await?);
        }
        Ok(deleted)
    }

    async fn revoke_and_delete(
        &self,
        mut record: DiiaIdIdentifier,
    ) -> Result<DiiaIdIdentifier, SigningError> {
        let key = record.key();
        let guard =
            self.state_machine
                .reserve(&key, LifecycleState::Active, LifecycleState::Revoking)?;

        let revocation_error = match record.identifier.clone() {
            Some(identifier) => {
                let request = RegistryRequest::CertificateRevoke(CertificateRevokeRequest {
                    identifier,
                    registry_user_identifier: record.registry_user_identifier.clone(),
                });
                match self.round_trip(&key.to_string(), request).await {
                    Ok(reply) => revoke_outcome(reply),
                    Err(err) => Some(err.to_string()),
                }
            }
            // Active without an issued identifier should not happen;
            // nothing to revoke remotely.
            None => Some("no issued identifier on record".into()),
        };

        if let Some(reason) = &revocation_error {
            warn!(
                key = %key,
                reason = %reason,
                "Deleting identifier with unconfirmed remote revocation"
            );
        }

        record.state = LifecycleState::Deleted;
        record.is_deleted = true;
        record.deleted_at = Some(Utc::now());
        record.revocation_error = revocation_error;

        guard.commit(record.clone())?;
        info!(key = %key, "Identifier deleted");
        Ok(record)
    }

    // =========================================================================
    // SIGNING WORKFLOWS
    // =========================================================================

    /// Hash a batched file set under the key's active identifier.
    ///
    /// The full set travels in one request. Hashing is a pure function of
    /// the file bytes, so a timed-out request is retried once; any other
    /// failure surfaces directly.
    pub async fn hash_files_to_sign(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
        files: &[FileToHash],
    ) -> Result<Vec<HashedFile>, SigningError> {
        let key = IdentifierKey::new(user_identifier, mobile_uid, sign_algo);
        let (identifier, serial, record) = self.signing_context(&key)?;

        let request = HashFilesRequest {
            identifier,
            registry_user_identifier: record.registry_user_identifier,
            certificate_serial_number: serial,
            files: files.to_vec(),
            sign_algo,
        };

        let context = key.to_string();
        let reply = match self
            .round_trip(&context, RegistryRequest::HashFiles(request.clone()))
            .await
        {
            Err(SigningError::Timeout { kind }) => {
                warn!(key = %key, kind = %kind, "Hash request timed out, retrying once");
                self.round_trip(&context, RegistryRequest::HashFiles(request))
                    .await?
            }
            other => other?,
        };

        let response = expect_hash_files(reply)?;
        if let Some(err) = response.error {
            return Err(SigningError::RegistryUnavailable {
                message: err.message,
                http_code: err.http_code,
            });
        }

        hashing::align_hashes(files, &response.hashes)
    }

    /// Initiate signing over previously computed hashes.
    ///
    /// Never retried: the external signature process may have side
    /// effects, so a timeout surfaces directly to the caller.
    pub async fn init_hashes_signing(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
        options: SigningOptions,
    ) -> Result<(), SigningError> {
        let key = IdentifierKey::new(user_identifier, mobile_uid, sign_algo);
        let (identifier, serial, record) = self.signing_context(&key)?;

        let request = RegistryRequest::InitSigning(InitSigningParams {
            identifier,
            certificate_serial_number: serial,
            registry_user_identifier: record.registry_user_identifier,
            sign_type: options.sign_type,
            no_signing_time: options.no_signing_time,
            no_content_timestamp: options.no_content_timestamp,
        });

        let reply = self.round_trip(&key.to_string(), request).await?;
        let response = expect_init_signing(reply)?;

        if let Some(err) = response.error {
            return Err(SigningError::RegistryUnavailable {
                message: err.message,
                http_code: err.http_code,
            });
        }
        match response.response {
            Some(data) if data.success => {
                info!(key = %key, "Signing initiated");
                Ok(())
            }
            _ => Err(SigningError::NoValidCertificate(
                "registry declined signing initiation".into(),
            )),
        }
    }

    /// Hash a file set and initiate signing over the result.
    ///
    /// Signing is stateless relative to the identifier's lifecycle; the
    /// identifier stays `Active` throughout.
    pub async fn hash_and_sign(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
        files: &[FileToHash],
        options: SigningOptions,
    ) -> Result<Vec<HashedFile>, SigningError> {
        let hashes = self
            .hash_files_to_sign(user_identifier, mobile_uid, sign_algo, files)
            .await?;
        self.init_hashes_signing(user_identifier, mobile_uid, sign_algo, options)
            .await?;
        Ok(hashes)
    }

    /// Check previously issued signatures over file hashes.
    ///
    /// The overall result is valid only if every file's verdict is
    /// positive; failing file names are reported so the caller can say
    /// which documents failed.
    pub async fn validate_hash_signatures(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
        files: &[SignedFileHash],
        return_originals: Option<bool>,
    ) -> Result<SignatureValidation, SigningError> {
        let key = IdentifierKey::new(user_identifier, mobile_uid, sign_algo);
        let (identifier, serial, record) = self.signing_context(&key)?;

        let request = RegistryRequest::IntegrityCheck(IntegrityCheckRequest {
            identifier,
            registry_user_identifier: record.registry_user_identifier,
            certificate_serial_number: serial,
            files: files.to_vec(),
            return_originals,
        });

        let reply = self.round_trip(&key.to_string(), request).await?;
        let response = expect_integrity_check(reply)?;
        if let Some(err) = response.error {
            return Err(SigningError::RegistryUnavailable {
                message: err.message,
                http_code: err.http_code,
            });
        }

        let results = hashing::align_check_results(files, &response.check_results)?;
        let failing_files = hashing::failing_files(&results);
        Ok(SignatureValidation {
            is_valid: failing_files.is_empty(),
            failing_files,
            results,
        })
    }

    /// Whether every submitted signature is still valid.
    pub async fn are_signed_file_hashes_valid(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
        files: &[SignedFileHash],
    ) -> Result<bool, SigningError> {
        let validation = self
            .validate_hash_signatures(user_identifier, mobile_uid, sign_algo, files, None)
            .await?;
        Ok(validation.is_valid)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// The non-deleted record for one key, if any.
    #[must_use]
    pub fn get_identifier(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
    ) -> Option<DiiaIdIdentifier> {
        let key = IdentifierKey::new(user_identifier, mobile_uid, sign_algo);
        self.store.get(&key).filter(|r| !r.is_deleted)
    }

    /// All non-deleted records for a device, across algorithms.
    #[must_use]
    pub fn get_identifiers(&self, user_identifier: &str, mobile_uid: &str) -> Vec<DiiaIdIdentifier> {
        self.store.for_device(user_identifier, mobile_uid)
    }

    /// Whether the key's identifier is active and unexpired.
    #[must_use]
    pub fn check_identifier_availability(
        &self,
        user_identifier: &str,
        mobile_uid: &str,
        sign_algo: SignAlgo,
    ) -> bool {
        self.get_identifier(user_identifier, mobile_uid, sign_algo)
            .is_some_and(|r| r.is_available(Utc::now()))
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// One asynchronous round trip: register a pending operation, publish
    /// the request under its correlation id, await the outcome.
    async fn round_trip(
        &self,
        context: &str,
        request: RegistryRequest,
    ) -> Result<RegistryReply, SigningError> {
        let kind = request.kind();
        let timeout = self.config.timeouts.for_kind(kind);
        let (correlation_id, rx) = self.registry.register(kind, context, timeout)?;

        if let Err(err) = self.gateway.publish(correlation_id, request).await {
            // A late response can no longer resurrect this operation.
            self.registry.cancel(correlation_id);
            return Err(err);
        }

        match rx.await {
            Ok(outcome) => outcome,
            // Sender dropped without a value; only possible mid-shutdown.
            Err(_) => Err(SigningError::Unavailable),
        }
    }

    /// The identifier, certificate serial, and record required for a
    /// signing operation; the identifier must be usable right now.
    fn signing_context(
        &self,
        key: &IdentifierKey,
    ) -> Result<(String, String, DiiaIdIdentifier), SigningError> {
        let record = self
            .store
            .get(key)
            .filter(|r| r.is_available(Utc::now()))
            .ok_or_else(|| SigningError::NotFound { key: key.clone() })?;

        let identifier = record
            .identifier
            .clone()
            .ok_or_else(|| SigningError::NotFound { key: key.clone() })?;
        let serial = record.certificate_serial_number.clone().ok_or_else(|| {
            SigningError::NoValidCertificate("no certificate serial on record".into())
        })?;

        Ok((identifier, serial, record))
    }
}

fn parse_expiration(key: &IdentifierKey, raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(err) => {
            warn!(key = %key, raw = %raw, error = %err, "Unparseable certificate expiration");
            None
        }
    }
}

fn revoke_outcome(reply: RegistryReply) -> Option<String> {
    match reply {
        RegistryReply::CertificateRevoke(response) => {
            if let Some(err) = response.error {
                return Some(format!("registry error (http {}): {}", err.http_code, err.message));
            }
            match response.response {
                Some(data) if data.success => None,
                Some(data) => data.error.or_else(|| Some("revocation rejected".into())),
                None => Some("empty revocation response".into()),
            }
        }
        other => Some(format!("unexpected {} reply to revocation", other.kind())),
    }
}

fn expect_certificate_create(
    reply: RegistryReply,
) -> Result<signing_types::registry::CertificateCreateResponse, SigningError> {
    match reply {
        RegistryReply::CertificateCreate(response) => Ok(response),
        other => Err(SigningError::UnexpectedReply {
            expected: OperationKind::CertificateCreate,
            got: other.kind(),
        }),
    }
}

fn expect_hash_files(
    reply: RegistryReply,
) -> Result<signing_types::registry::HashFilesResponse, SigningError> {
    match reply {
        RegistryReply::HashFiles(response) => Ok(response),
        other => Err(SigningError::UnexpectedReply {
            expected: OperationKind::HashFiles,
            got: other.kind(),
        }),
    }
}

fn expect_init_signing(
    reply: RegistryReply,
) -> Result<signing_types::registry::InitSigningResponse, SigningError> {
    match reply {
        RegistryReply::InitSigning(response) => Ok(response),
        other => Err(SigningError::UnexpectedReply {
            expected: OperationKind::InitSigning,
            got: other.kind(),
        }),
    }
}

fn expect_integrity_check(
    reply: RegistryReply,
) -> Result<signing_types::registry::IntegrityCheckResponse, SigningError> {
    match reply {
        RegistryReply::IntegrityCheck(response) => Ok(response),
        other => Err(SigningError::UnexpectedReply {
            expected: OperationKind::IntegrityCheck,
            got: other.kind(),
        }),
    }
}
