//! Debounced, cluster-deduplicated aggregate broadcasts.
//!
//! Without coordination, N replicas each reacting to the same presence
//! change would each broadcast a count, flickering every client. A round
//! runs under the cooperative lock from `cabine-core`: whichever replica
//! acquires it sleeps out the debounce window and emits once; the rest bail
//! at the acquire. The lock guards the window, not the emission, so the
//! count is taken after release and is as fresh as possible.

use std::time::Duration;

use tracing::debug;

use cabine_core::{EventPayload, LockService, Result, RoomName, RoomTransport};

use crate::metrics::record_presence_broadcast;
use crate::protocol::VisitorCount;

/// Parameters of one debounced broadcast family.
#[derive(Debug, Clone)]
pub struct BroadcastSpec {
    /// Cooperative lock name shared by every replica.
    pub lock_name: String,
    /// Age past which the lock counts as abandoned. Must exceed `debounce`,
    /// otherwise a replica mid-sleep looks abandoned.
    pub max_lock_age: Duration,
    /// Quiet window between the trigger and the count.
    pub debounce: Duration,
    /// Room whose membership is counted and notified.
    pub room: RoomName,
    /// Event name carrying the count.
    pub event: String,
}

/// Runs one debounced broadcast round.
///
/// Returns `true` when this call emitted the count, `false` when another
/// replica owned the round (lock already held, or taken over mid-sleep).
///
/// # Errors
///
/// Propagates store and transport failures; the caller decides whether a
/// missed broadcast is worth surfacing.
pub async fn broadcast_count(
    lock: &LockService,
    transport: &dyn RoomTransport,
    spec: &BroadcastSpec,
) -> Result<bool> {
    if !lock.acquire(&spec.lock_name, spec.max_lock_age).await? {
        return Ok(false);
    }

    tokio::time::sleep(spec.debounce).await;

    // Another replica treated the lock as abandoned mid-sleep; its round
    // owns the emission now.
    if !lock.has_lock(&spec.lock_name).await? {
        debug!(lock = %spec.lock_name, "broadcast lock lost during debounce");
        return Ok(false);
    }
    lock.release(&spec.lock_name).await?;

    let count = transport.members(&spec.room).await?.len();
    transport
        .emit_to_room(
            &spec.room,
            &spec.event,
            EventPayload::json(&VisitorCount { count })?,
        )
        .await?;
    record_presence_broadcast();
    debug!(room = %spec.room, count, "aggregate count broadcast");
    Ok(true)
}
