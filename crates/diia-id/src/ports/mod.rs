//! Outbound ports.

pub mod gateway;

pub use gateway::{ExternalGateway, RegistryRequest};
