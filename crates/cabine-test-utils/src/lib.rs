//! Shared test utilities for cabine integration tests.
//!
//! This crate provides:
//! - [`TracingKvStore`]: In-memory key-value store with operation recording
//! - [`TracingRoomTransport`]: Room transport with failure injection
//! - [`TestHarness`]: Pre-configured coordination stack over tracing fakes
//! - Custom assertion helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use cabine_test_utils::{TestHarness, assert_event_emitted};
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let harness = TestHarness::new();
//!     harness.seed_session("sess-1", true);
//!     let interpreter = harness.seed_interpreter("tok-1", "user-1", "ada@example.com");
//!     // ... drive the coordinator ...
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod assertions;
pub mod fixtures;
pub mod storage;
pub mod transport;

pub use assertions::*;
pub use fixtures::*;
pub use storage::*;
pub use transport::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("cabine=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
