//! Inbound event dispatcher.
//!
//! Background task subscribed to the response side of the signing bus.
//! Each response envelope is converted to a typed reply and handed to
//! the correlation registry, which fulfills the matching pending
//! operation. Unknown, late, or duplicate ids are dropped there; a
//! malformed correlation id is dropped here.

use crate::domain::correlation::CorrelationId;
use crate::domain::pending::{CorrelationRegistry, RegistryReply};
use signing_bus::{Direction, EventFilter, EventStream, InMemoryEventBus, RegistryEvent};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

/// Routes registry responses to their pending operations.
pub struct EventDispatcher {
    stream: EventStream,
    registry: Arc<CorrelationRegistry>,
}

impl EventDispatcher {
    /// Create a dispatcher over the given bus and registry.
    ///
    /// The subscription is taken here, so responses published after
    /// construction are never missed, even before `run` is polled.
    #[must_use]
    pub fn new(bus: &InMemoryEventBus, registry: Arc<CorrelationRegistry>) -> Self {
        Self {
            stream: bus.event_stream(EventFilter::direction(Direction::Response)),
            registry,
        }
    }

    /// Spawn the dispatch loop as a background task.
    ///
    /// The task ends when the bus is dropped.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the dispatch loop until the bus closes.
    pub async fn run(mut self) {
        info!("Event dispatcher listening for registry responses");

        while let Some(event) = self.stream.next().await {
            dispatch(&self.registry, event);
        }

        info!("Event bus closed, dispatcher stopping");
    }
}

fn dispatch(registry: &CorrelationRegistry, event: RegistryEvent) {
    let raw_id = event.correlation_id().to_string();
    let Some(reply) = event_to_reply(event) else {
        return;
    };

    let correlation_id = match CorrelationId::parse(&raw_id) {
        Ok(id) => id,
        Err(err) => {
            warn!(
                correlation_id = %raw_id,
                error = %err,
                "Dropping response with malformed correlation id"
            );
            return;
        }
    };

    debug!(
        correlation_id = %correlation_id,
        kind = %reply.kind(),
        "Dispatching registry response"
    );
    registry.resolve(correlation_id, reply);
}

/// Convert a response envelope to a typed reply. Request envelopes are
/// filtered out before this point; returning `None` keeps the loop total.
fn event_to_reply(event: RegistryEvent) -> Option<RegistryReply> {
    match event {
        RegistryEvent::CertificateCreated { payload, .. } => {
            Some(RegistryReply::CertificateCreate(payload))
        }
        RegistryEvent::CertificateRevoked { payload, .. } => {
            Some(RegistryReply::CertificateRevoke(payload))
        }
        RegistryEvent::FilesHashed { payload, .. } => Some(RegistryReply::HashFiles(payload)),
        RegistryEvent::SigningInitiated { payload, .. } => {
            Some(RegistryReply::InitSigning(payload))
        }
        RegistryEvent::IntegrityChecked { payload, .. } => {
            Some(RegistryReply::IntegrityCheck(payload))
        }
        _ => None,
    }
}
