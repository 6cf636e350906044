//! Audio relay: low-latency chunk fan-out with best-effort archival.
//!
//! This is the hot path. A chunk is gated on the sender's reverse record,
//! broadcast to the channel room, and only then handed to a spawned task
//! for archival; the upload never sits between the interpreter and the
//! listeners.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{trace, warn};

use cabine_core::keys::{ActiveInterpreterKey, ArchiveKey};
use cabine_core::kv::get_json;
use cabine_core::{ConnectionId, EventPayload, KvStore, Result, RoomTransport};

use crate::booth::ActiveInterpreterRecord;
use crate::directory::ArchiveStore;
use crate::metrics::{record_audio_archive_failure, record_audio_chunk_relayed};
use crate::protocol::CHANNEL_DATA;

/// Fans interpreter audio out to channel listeners.
#[derive(Clone)]
pub struct AudioRelay {
    kv: Arc<dyn KvStore>,
    transport: Arc<dyn RoomTransport>,
    archive: Arc<dyn ArchiveStore>,
}

impl AudioRelay {
    /// Creates the relay over the shared fabrics and archive.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KvStore>,
        transport: Arc<dyn RoomTransport>,
        archive: Arc<dyn ArchiveStore>,
    ) -> Self {
        Self {
            kv,
            transport,
            archive,
        }
    }

    /// Relays one audio chunk from `conn` to its booth's channel room.
    ///
    /// Chunks from a connection with no reverse record are dropped without
    /// error: after a takeover or disconnect, the displaced sender keeps
    /// transmitting until its client reacts, and that is expected traffic.
    ///
    /// Archival runs on a spawned task; upload failures are logged and
    /// counted, never surfaced here.
    ///
    /// # Errors
    ///
    /// Propagates store failures from the gate lookup and transport failures
    /// from the broadcast.
    pub async fn relay(&self, conn: &ConnectionId, chunk: Bytes) -> Result<()> {
        let Some(reverse) = get_json::<ActiveInterpreterRecord>(
            self.kv.as_ref(),
            ActiveInterpreterKey::connection(conn),
        )
        .await?
        else {
            trace!(connection = %conn, "dropped audio chunk from inactive sender");
            return Ok(());
        };

        let booth = reverse.booth;
        self.transport
            .emit_to_room(
                &booth.channel_room(),
                CHANNEL_DATA,
                EventPayload::Binary(chunk.clone()),
            )
            .await?;
        record_audio_chunk_relayed();

        let key = ArchiveKey::chunk(&booth, Utc::now());
        let archive = Arc::clone(&self.archive);
        tokio::spawn(async move {
            if let Err(e) = archive.upload(key.as_ref(), chunk).await {
                record_audio_archive_failure();
                warn!(key = %key, error = %e, "audio chunk archival failed");
            }
        });
        Ok(())
    }
}
