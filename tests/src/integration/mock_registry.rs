//! Scripted external registry.
//!
//! Subscribes to the request side of the bus and answers on the response
//! side, echoing the correlation id the way the real registry echoes the
//! caller-supplied uuid. Behavior knobs simulate outages, partial
//! responses, failed integrity checks, and duplicate deliveries.

use chrono::{Duration as ChronoDuration, Utc};
use signing_bus::{Direction, EventFilter, EventPublisher, InMemoryEventBus, RegistryEvent, Subscription};
use signing_types::entities::HashedFile;
use signing_types::registry::{
    CertificateCreateData, CertificateCreateResponse, CertificateRevokeData,
    CertificateRevokeResponse, HashFilesResponse, InitSigningData, InitSigningResponse,
    IntegrityCheckResponse, RegistryError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// What the mock registry does with each request kind.
#[derive(Debug, Clone)]
pub struct RegistryBehavior {
    /// Serial number issued on certificate creation.
    pub certificate_serial: String,
    /// Answer creations with this error instead of a certificate.
    pub create_error: Option<(u16, String)>,
    /// Hold each creation response for this long.
    pub create_delay: Option<Duration>,
    /// Never answer revocation requests.
    pub silent_revoke: bool,
    /// Never answer signing initiations.
    pub silent_signing: bool,
    /// Answer hash requests with one entry missing.
    pub drop_last_hash: bool,
    /// File names whose integrity verdict is negative.
    pub failing_files: Vec<String>,
    /// Publish every response twice (bus duplicate delivery).
    pub duplicate_responses: bool,
}

impl Default for RegistryBehavior {
    fn default() -> Self {
        Self {
            certificate_serial: "S1".into(),
            create_error: None,
            create_delay: None,
            silent_revoke: false,
            silent_signing: false,
            drop_last_hash: false,
            failing_files: Vec::new(),
            duplicate_responses: false,
        }
    }
}

/// In-process stand-in for the external signing registry.
pub struct MockRegistry {
    bus: Arc<InMemoryEventBus>,
    subscription: Subscription,
    behavior: RegistryBehavior,
}

impl MockRegistry {
    /// Subscribe to the request side of the bus.
    ///
    /// The subscription is taken here, so requests published after
    /// construction are never missed.
    #[must_use]
    pub fn new(bus: Arc<InMemoryEventBus>, behavior: RegistryBehavior) -> Self {
        let subscription = bus.subscribe(EventFilter::direction(Direction::Request));
        Self {
            bus,
            subscription,
            behavior,
        }
    }

    /// Spawn the answer loop as a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(event) = self.subscription.recv().await {
            let Some(response) = self.answer(event).await else {
                continue;
            };
            self.bus.publish(response.clone()).await;
            if self.behavior.duplicate_responses {
                self.bus.publish(response).await;
            }
        }
    }

    async fn answer(&self, event: RegistryEvent) -> Option<RegistryEvent> {
        match event {
            RegistryEvent::CertificateCreateRequested {
                correlation_id,
                payload,
            } => {
                if let Some(delay) = self.behavior.create_delay {
                    tokio::time::sleep(delay).await;
                }
                let response = match &self.behavior.create_error {
                    Some((http_code, message)) => CertificateCreateResponse {
                        uuid: correlation_id.clone(),
                        response: None,
                        error: Some(RegistryError {
                            message: message.clone(),
                            http_code: *http_code,
                        }),
                    },
                    None => CertificateCreateResponse {
                        uuid: correlation_id.clone(),
                        response: Some(CertificateCreateData {
                            identifier: format!("diia-{}", payload.identifier),
                            success: true,
                            certificate_serial_number: self.behavior.certificate_serial.clone(),
                            expiration_date: (Utc::now() + ChronoDuration::days(365)).to_rfc3339(),
                        }),
                        error: None,
                    },
                };
                Some(RegistryEvent::CertificateCreated {
                    correlation_id,
                    payload: response,
                })
            }

            RegistryEvent::CertificateRevokeRequested { correlation_id, .. } => {
                if self.behavior.silent_revoke {
                    return None;
                }
                Some(RegistryEvent::CertificateRevoked {
                    correlation_id: correlation_id.clone(),
                    payload: CertificateRevokeResponse {
                        uuid: correlation_id,
                        response: Some(CertificateRevokeData {
                            success: true,
                            error: None,
                        }),
                        error: None,
                    },
                })
            }

            RegistryEvent::HashFilesRequested {
                correlation_id,
                payload,
            } => {
                // Deterministic hash of name and content, so repeated
                // requests over the same file set are identical.
                let mut hashes: Vec<HashedFile> = payload
                    .files
                    .iter()
                    .map(|f| HashedFile {
                        name: f.name.clone(),
                        hash: format!("hash({}:{})", f.name, f.file),
                    })
                    .collect();
                if self.behavior.drop_last_hash {
                    hashes.pop();
                }
                Some(RegistryEvent::FilesHashed {
                    correlation_id,
                    payload: HashFilesResponse {
                        identifier: payload.identifier,
                        hashes,
                        error: None,
                    },
                })
            }

            RegistryEvent::InitSigningRequested {
                correlation_id,
                payload,
            } => {
                if self.behavior.silent_signing {
                    return None;
                }
                Some(RegistryEvent::SigningInitiated {
                    correlation_id: correlation_id.clone(),
                    payload: InitSigningResponse {
                        uuid: correlation_id,
                        response: Some(InitSigningData {
                            identifier: payload.request.identifier,
                            success: true,
                        }),
                        error: None,
                    },
                })
            }

            RegistryEvent::IntegrityCheckRequested {
                correlation_id,
                payload,
            } => {
                let check_results = payload
                    .files
                    .iter()
                    .map(|f| signing_types::entities::FileIntegrityResult {
                        name: f.name.clone(),
                        checked: !self.behavior.failing_files.contains(&f.name),
                    })
                    .collect();
                Some(RegistryEvent::IntegrityChecked {
                    correlation_id,
                    payload: IntegrityCheckResponse {
                        identifier: payload.identifier,
                        check_results,
                        error: None,
                    },
                })
            }

            // Responses (our own output) are filtered out by the
            // subscription; nothing else to answer.
            _ => None,
        }
    }
}
