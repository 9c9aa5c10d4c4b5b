//! Cross-crate choreography: orchestrator, dispatcher, and mock registry
//! talking over one in-memory bus.

pub mod mock_registry;

#[cfg(test)]
mod workflows;
