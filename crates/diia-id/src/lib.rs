//! # diia-id
//!
//! DiiaId identifier lifecycle and signing workflows for Diia-Signing.
//!
//! ## Role in System
//!
//! - **Lifecycle Owner**: drives `None → Creating → Active → Revoking →
//!   Deleted` per identifier key, serialized by a per-key transition lock
//! - **Correlation Broker**: matches asynchronous registry responses to
//!   pending operations by correlation id, with mandatory timeouts
//! - **Workflow Surface**: identifier creation/deletion, hash-then-sign,
//!   and signature integrity validation
//!
//! ## Asynchronous Flow
//!
//! ```text
//! [Orchestrator] ──reserve──→ [IdentifierStateMachine]
//!       │
//!       ├──register──→ [CorrelationRegistry] ──(correlation id, future)
//!       │
//!       ├──publish───→ [ExternalGateway] ──request envelope──→ [Bus]
//!       │                                                        │
//!       │            [EventDispatcher] ←──response envelope──────┘
//!       │                   │
//!       │←──resolve─────────┘
//!       │
//!       └──commit/abort──→ [IdentifierStateMachine] ──→ [IdentifierStore]
//! ```

pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use domain::*;
pub use ipc::*;
pub use ports::*;
pub use service::*;
