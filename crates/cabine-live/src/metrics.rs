//! Live-layer metrics.
//!
//! Counters for the paths where a log line is too noisy to be useful: the
//! audio hot path, takeovers, and presence broadcasts. These complement the
//! structured logging already in place.

use metrics::{counter, describe_counter};

// ============================================================================
// Metric names
// ============================================================================

/// Audio chunks relayed to channel rooms.
pub const AUDIO_CHUNKS_RELAYED: &str = "cabine_audio_chunks_relayed_total";

/// Audio chunks whose archival upload failed.
pub const AUDIO_ARCHIVE_FAILURES: &str = "cabine_audio_archive_failures_total";

/// Booth takeovers (start on an occupied booth).
pub const BOOTH_TAKEOVERS: &str = "cabine_booth_takeovers_total";

/// Debounced presence broadcasts actually emitted.
pub const PRESENCE_BROADCASTS: &str = "cabine_presence_broadcasts_total";

// ============================================================================
// Metric Registration
// ============================================================================

/// Registers all live-layer metric descriptions.
///
/// Call this once at application startup after initializing the metrics
/// recorder.
pub fn register_metrics() {
    describe_counter!(
        AUDIO_CHUNKS_RELAYED,
        "Total audio chunks relayed to channel rooms"
    );
    describe_counter!(
        AUDIO_ARCHIVE_FAILURES,
        "Total audio chunks whose archival upload failed"
    );
    describe_counter!(BOOTH_TAKEOVERS, "Total booth takeovers");
    describe_counter!(
        PRESENCE_BROADCASTS,
        "Total debounced presence broadcasts emitted"
    );
}

// ============================================================================
// Metric Recording
// ============================================================================

/// Records one relayed audio chunk.
pub fn record_audio_chunk_relayed() {
    counter!(AUDIO_CHUNKS_RELAYED).increment(1);
}

/// Records one failed archival upload.
pub fn record_audio_archive_failure() {
    counter!(AUDIO_ARCHIVE_FAILURES).increment(1);
}

/// Records one booth takeover.
pub fn record_booth_takeover() {
    counter!(BOOTH_TAKEOVERS).increment(1);
}

/// Records one emitted presence broadcast.
pub fn record_presence_broadcast() {
    counter!(PRESENCE_BROADCASTS).increment(1);
}
