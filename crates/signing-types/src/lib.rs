//! # Signing Types Crate
//!
//! This crate contains the DiiaId domain entities and the wire payloads
//! exchanged with the external signing registry.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Field-Exact Wire Types**: `registry` payloads serialize exactly as
//!   the external registry expects (camelCase fields, `http_code` error
//!   shape); they are never reshaped at the transport layer.
//! - **No Correlation In Payloads**: request/response matching uses the
//!   bus envelope's correlation id, not payload fields.

pub mod entities;
pub mod registry;

pub use entities::*;
pub use registry::*;
