//! # Diia-Signing Test Suite
//!
//! Unified test crate exercising the full signing workflows over the
//! in-memory bus against a scripted mock registry.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── mock_registry.rs  # Scripted registry on the response side
//!     └── workflows.rs      # End-to-end workflow scenarios
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p diia-tests
//! ```

pub mod integration;

/// Install the test log subscriber once; later calls are no-ops.
///
/// Run with `RUST_LOG=debug` to see correlation traffic.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
