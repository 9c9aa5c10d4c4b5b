//! Domain layer: correlation tracking, identifier lifecycle, and the pure
//! hash/integrity helpers.

pub mod config;
pub mod correlation;
pub mod error;
pub mod hashing;
pub mod pending;
pub mod state_machine;
pub mod store;

pub use config::{SigningConfig, TimeoutConfig};
pub use correlation::CorrelationId;
pub use error::{ProcessCode, SigningError};
pub use pending::{CorrelationRegistry, OperationKind, PendingStats, RegistryReply};
pub use state_machine::{IdentifierStateMachine, TransitionGuard};
pub use store::IdentifierStore;
