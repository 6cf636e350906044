//! Observability infrastructure for cabine.
//!
//! Structured logging with consistent spans. This module provides
//! initialization helpers and span constructors used across all components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `cabine_live=debug`)
///
/// # Example
///
/// ```rust
/// use cabine_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for booth operations with standard fields.
///
/// # Example
///
/// ```rust
/// use cabine_core::observability::booth_span;
///
/// let span = booth_span("start", "sess-42", "en");
/// let _guard = span.enter();
/// // ... do booth operation
/// ```
#[must_use]
pub fn booth_span(operation: &str, session: &str, channel: &str) -> Span {
    tracing::info_span!(
        "booth",
        op = operation,
        session = session,
        channel = channel,
    )
}

/// Creates a span for connection-scoped operations.
///
/// # Example
///
/// ```rust
/// use cabine_core::observability::connection_span;
///
/// let span = connection_span("bind", "sock-9M2f");
/// let _guard = span.enter();
/// // ... do connection operation
/// ```
#[must_use]
pub fn connection_span(operation: &str, connection: &str) -> Span {
    tracing::info_span!("connection", op = operation, connection = connection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_succeeds() {
        // Should not panic (uses Once internally)
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Pretty); // Second call should be no-op
    }

    #[test]
    fn test_booth_span_creates_span() {
        let span = booth_span("start", "sess-42", "en");
        let _guard = span.enter();
        tracing::info!("test message in span");
    }

    #[test]
    fn test_connection_span_creates_span() {
        let span = connection_span("bind", "sock-1");
        let _guard = span.enter();
        tracing::info!("connection message");
    }
}
