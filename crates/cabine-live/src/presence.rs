//! Aggregate site presence: who is online, as one number.
//!
//! Every connection joins a single well-known room for its whole lifetime.
//! Joiners get an immediate local count; the cluster-wide number follows
//! through the debounced broadcast, so churn collapses into one emission
//! per window no matter how many replicas saw it.

use std::sync::Arc;

use tracing::warn;

use cabine_core::{ConnectionId, EventPayload, LockService, Result, RoomName, RoomTransport};

use crate::broadcast::{broadcast_count, BroadcastSpec};
use crate::config::LiveConfig;
use crate::protocol::{VisitorCount, SITE_VISITORS};

/// Room every online connection sits in.
pub const SITE_ROOM: &str = "site";

/// Lock name shared by all replicas for the visitor broadcast.
pub const SITE_VISITORS_LOCK: &str = "site-visitors";

/// Tracks site-wide presence and keeps clients' visitor counts fresh.
#[derive(Clone)]
pub struct PresenceService {
    transport: Arc<dyn RoomTransport>,
    lock: LockService,
    spec: BroadcastSpec,
}

impl PresenceService {
    /// Creates the service with the configured debounce parameters.
    #[must_use]
    pub fn new(transport: Arc<dyn RoomTransport>, lock: LockService, config: &LiveConfig) -> Self {
        let spec = BroadcastSpec {
            lock_name: SITE_VISITORS_LOCK.to_string(),
            max_lock_age: config.presence_lock_max_age(),
            debounce: config.presence_debounce(),
            room: RoomName::new(SITE_ROOM),
            event: SITE_VISITORS.to_string(),
        };
        Self {
            transport,
            lock,
            spec,
        }
    }

    /// Registers a connection as online.
    ///
    /// The joiner immediately receives the local member count; the debounced
    /// cluster broadcast is triggered without being awaited, and its failure
    /// is logged rather than surfaced to the joiner.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the join and the targeted count.
    pub async fn came_online(&self, conn: &ConnectionId) -> Result<()> {
        self.transport.join(conn, &self.spec.room).await?;

        let count = self.transport.members(&self.spec.room).await?.len();
        self.transport
            .emit_to_connection(
                conn,
                SITE_VISITORS,
                EventPayload::json(&VisitorCount { count })?,
            )
            .await?;

        let lock = self.lock.clone();
        let transport = Arc::clone(&self.transport);
        let spec = self.spec.clone();
        tokio::spawn(async move {
            if let Err(e) = broadcast_count(&lock, transport.as_ref(), &spec).await {
                warn!(error = %e, "presence broadcast after join failed");
            }
        });
        Ok(())
    }

    /// Registers a connection as offline.
    ///
    /// The debounced broadcast is awaited here; a failure is logged, not
    /// propagated, since the connection is already gone.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the leave.
    pub async fn went_offline(&self, conn: &ConnectionId) -> Result<()> {
        self.transport.leave(conn, &self.spec.room).await?;
        if let Err(e) = broadcast_count(&self.lock, self.transport.as_ref(), &self.spec).await {
            warn!(connection = %conn, error = %e, "presence broadcast after leave failed");
        }
        Ok(())
    }
}
