//! # Signing Bus - Asynchronous Registry Communication
//!
//! The external signing registry is reachable only through a
//! fire-and-forget message bus: every request is published with a fresh
//! correlation id and its answer arrives later, on a different channel,
//! tagged only by that id.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Orchestrator │                    │   Registry   │
//! │              │    publish()       │   (remote)   │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │ ─────────┘
//!                  │              │ ←──────── response envelope
//!                  └──────────────┘  subscribe()
//! ```
//!
//! This crate owns the typed envelopes and the in-memory bus used by
//! tests and single-process deployments; a distributed deployment swaps
//! in a transport-backed implementation of the same traits.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{Direction, EventFilter, EventTopic, RegistryEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
