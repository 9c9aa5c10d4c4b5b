//! Event bus implementation of the outbound gateway port.
//!
//! Translates typed registry requests into bus envelopes. Publishing is
//! fire-and-forget: delivery of the response is the dispatcher's job.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::SigningError;
use crate::ports::gateway::{ExternalGateway, RegistryRequest};
use async_trait::async_trait;
use signing_bus::{EventPublisher, InMemoryEventBus, RegistryEvent};
use signing_types::registry::InitSigningRequest;
use std::sync::Arc;
use tracing::{debug, warn};

/// Publishes request envelopes to the shared signing bus.
pub struct BusGateway {
    bus: Arc<InMemoryEventBus>,
}

impl BusGateway {
    /// Create a gateway over the given bus.
    #[must_use]
    pub fn new(bus: Arc<InMemoryEventBus>) -> Self {
        Self { bus }
    }
}

fn to_event(correlation_id: CorrelationId, request: RegistryRequest) -> RegistryEvent {
    let correlation_id = correlation_id.to_string();
    match request {
        RegistryRequest::CertificateCreate(payload) => RegistryEvent::CertificateCreateRequested {
            correlation_id,
            payload,
        },
        RegistryRequest::CertificateRevoke(payload) => RegistryEvent::CertificateRevokeRequested {
            correlation_id,
            payload,
        },
        RegistryRequest::HashFiles(payload) => RegistryEvent::HashFilesRequested {
            correlation_id,
            payload,
        },
        // The registry echoes the envelope's uuid field; it carries the
        // same value as the correlation id.
        RegistryRequest::InitSigning(params) => RegistryEvent::InitSigningRequested {
            payload: InitSigningRequest {
                uuid: correlation_id.clone(),
                request: params,
            },
            correlation_id,
        },
        RegistryRequest::IntegrityCheck(payload) => RegistryEvent::IntegrityCheckRequested {
            correlation_id,
            payload,
        },
    }
}

#[async_trait]
impl ExternalGateway for BusGateway {
    async fn publish(
        &self,
        correlation_id: CorrelationId,
        request: RegistryRequest,
    ) -> Result<(), SigningError> {
        let kind = request.kind();
        let event = to_event(correlation_id, request);

        let receivers = self.bus.publish(event).await;
        if receivers == 0 {
            // No registry listener; the pending operation will time out.
            warn!(
                correlation_id = %correlation_id,
                kind = %kind,
                "No subscribers for registry request"
            );
        } else {
            debug!(
                correlation_id = %correlation_id,
                kind = %kind,
                receivers = receivers,
                "Published registry request"
            );
        }

        Ok(())
    }
}
