//! Channel membership: listener fan-out rooms per booth.
//!
//! Attendees who want to hear a booth's output join `channel/{booth}`. The
//! room is pure fan-out; all interpretation state lives with the booth
//! service. Channel codes are validated at [`BoothId`] construction, so an
//! unknown locale never reaches this module.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use cabine_core::{BoothId, ConnectionId, Error, Result, RoomTransport};

use crate::auth::AuthBinding;
use crate::directory::{EventSink, SessionDirectory, SessionInfo, TrackContext};
use crate::protocol::{CHANNEL_JOINED, CHANNEL_LEFT};

/// Joins and leaves listener channel rooms.
#[derive(Clone)]
pub struct ChannelService {
    transport: Arc<dyn RoomTransport>,
    auth: AuthBinding,
    sessions: Arc<dyn SessionDirectory>,
    events: Arc<dyn EventSink>,
}

impl ChannelService {
    /// Creates the service over the shared transport and directories.
    #[must_use]
    pub fn new(
        transport: Arc<dyn RoomTransport>,
        auth: AuthBinding,
        sessions: Arc<dyn SessionDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            auth,
            sessions,
            events,
        }
    }

    /// Adds `conn` to the booth's channel room.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the connection is not
    /// authenticated and [`Error::BadRequest`] when the session is unknown
    /// or does not have interpretation enabled.
    pub async fn join(&self, conn: &ConnectionId, booth: &BoothId) -> Result<()> {
        let packet = self.auth.resolve(conn).await?;
        self.require_session(booth).await?;

        self.transport.join(conn, &booth.channel_room()).await?;
        debug!(connection = %conn, booth = %booth, "joined channel room");

        self.events.track(
            CHANNEL_JOINED,
            json!({"sessionId": booth.session.as_str(), "channel": booth.channel.as_str()}),
            TrackContext::authenticated(&packet.claims.subject, conn),
        );
        Ok(())
    }

    /// Removes `conn` from the booth's channel room.
    ///
    /// Leaving a room the connection never joined is a no-op, not an error;
    /// the tracking event fires either way.
    ///
    /// # Errors
    ///
    /// Same validation as [`ChannelService::join`].
    pub async fn leave(&self, conn: &ConnectionId, booth: &BoothId) -> Result<()> {
        let packet = self.auth.resolve(conn).await?;
        self.require_session(booth).await?;

        let room = booth.channel_room();
        if self.transport.members(&room).await?.contains(conn) {
            self.transport.leave(conn, &room).await?;
            debug!(connection = %conn, booth = %booth, "left channel room");
        }

        self.events.track(
            CHANNEL_LEFT,
            json!({"sessionId": booth.session.as_str(), "channel": booth.channel.as_str()}),
            TrackContext::authenticated(&packet.claims.subject, conn),
        );
        Ok(())
    }

    async fn require_session(&self, booth: &BoothId) -> Result<SessionInfo> {
        let session = self
            .sessions
            .find_session(&booth.session)
            .await?
            .ok_or_else(|| Error::bad_request(format!("unknown session '{}'", booth.session)))?;
        if !session.interpretation_enabled {
            return Err(Error::bad_request(format!(
                "session '{}' does not have interpretation enabled",
                booth.session
            )));
        }
        Ok(session)
    }
}
