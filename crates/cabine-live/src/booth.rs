//! Booth coordination: the hand-off state machine for interpreter booths.
//!
//! A booth is Empty until an interpreter goes live, at which point an
//! [`ActiveBoothRecord`] appears at `active-booth/{session}/{channel}` and a
//! reverse [`ActiveInterpreterRecord`] at `active-interpreter/{connection}`
//! lets the audio path find the booth without a scan. The records are the
//! whole state; there is no in-process copy to drift out of sync across
//! replicas.
//!
//! Hand-off is deliberately last-writer-wins. `start` on an occupied booth
//! sends the displaced holder a targeted takeover notice and then replaces
//! the record with a plain write, accepting that two interpreters starting
//! in the same instant both believe they won until the notices land.

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use cabine_core::keys::{ActiveBoothKey, ActiveInterpreterKey};
use cabine_core::kv::{get_json, put_json};
use cabine_core::{
    BoothId, ConnectionId, Error, EventPayload, KvStore, Result, RoomName, RoomTransport, SubjectId,
};

use crate::auth::{AuthBinding, SocketAuthPacket};
use crate::directory::{EventSink, InterpreterRecord, SessionDirectory, TrackContext};
use crate::metrics::record_booth_takeover;
use crate::policy;
use crate::protocol::{
    BoothMessageNotice, BoothOccupant, InterpreterLeftNotice, InterpreterNotice,
    InterpreterRequestNotice, RosterNotice, CHANNEL_STARTED, CHANNEL_STOPPED, INTERPRETER_ACCEPTED,
    INTERPRETER_JOINED, INTERPRETER_LEFT, INTERPRETER_MESSAGE, INTERPRETER_REQUESTED,
    INTERPRETER_ROSTER, INTERPRETER_STARTED, INTERPRETER_STOPPED, INTERPRETER_TAKEOVER,
};

// ============================================================================
// Records
// ============================================================================

/// Store record marking a booth Occupied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBoothRecord {
    /// Connection the active interpreter is working from.
    pub connection_id: ConnectionId,
    /// Subject behind that connection.
    pub attendee_subject_id: SubjectId,
    /// The active interpreter's directory entry.
    pub interpreter: InterpreterRecord,
}

/// Reverse index from a connection to the booth it is actively working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveInterpreterRecord {
    /// The booth this connection holds.
    pub booth: BoothId,
}

// ============================================================================
// Service
// ============================================================================

/// Runs the booth state machine over the shared store and transport.
#[derive(Clone)]
pub struct BoothService {
    kv: Arc<dyn KvStore>,
    transport: Arc<dyn RoomTransport>,
    auth: AuthBinding,
    sessions: Arc<dyn SessionDirectory>,
    events: Arc<dyn EventSink>,
}

impl BoothService {
    /// Creates the service over the shared fabrics and directories.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KvStore>,
        transport: Arc<dyn RoomTransport>,
        auth: AuthBinding,
        sessions: Arc<dyn SessionDirectory>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            kv,
            transport,
            auth,
            sessions,
            events,
        }
    }

    /// Enters the booth's interpret room.
    ///
    /// The joiner alone receives the current roster and, when the booth is
    /// occupied, a started notice for the active interpreter; the whole room
    /// then learns about the joiner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the caller is not a registered
    /// interpreter and [`Error::NotFound`] for an unknown session.
    pub async fn join(&self, conn: &ConnectionId, booth: &BoothId) -> Result<()> {
        let (packet, interpreter) = self.authorize(conn, booth).await?;
        let room = booth.interpret_room();
        self.transport.join(conn, &room).await?;

        // Late joiners need to see the room as it already stands.
        let occupants = self.roster_excluding(conn, &room).await?;
        self.transport
            .emit_to_connection(
                conn,
                INTERPRETER_ROSTER,
                EventPayload::json(&RosterNotice { occupants })?,
            )
            .await?;

        if let Some(active) =
            get_json::<ActiveBoothRecord>(self.kv.as_ref(), ActiveBoothKey::booth(booth)).await?
        {
            self.transport
                .emit_to_connection(
                    conn,
                    INTERPRETER_STARTED,
                    EventPayload::json(&InterpreterNotice {
                        connection_id: active.connection_id,
                        interpreter: active.interpreter,
                    })?,
                )
                .await?;
        }

        self.transport
            .emit_to_room(
                &room,
                INTERPRETER_JOINED,
                EventPayload::json(&InterpreterNotice {
                    connection_id: conn.clone(),
                    interpreter,
                })?,
            )
            .await?;

        debug!(connection = %conn, booth = %booth, "joined booth");
        self.track_booth_event(INTERPRETER_JOINED, booth, &packet, conn);
        Ok(())
    }

    /// Leaves the booth's interpret room.
    ///
    /// A holder leaving releases the booth: both records are deleted and the
    /// stopped notices go out.
    ///
    /// # Errors
    ///
    /// Same authorization as [`BoothService::join`].
    pub async fn leave(&self, conn: &ConnectionId, booth: &BoothId) -> Result<()> {
        let (packet, interpreter) = self.authorize(conn, booth).await?;
        let room = booth.interpret_room();
        self.transport.leave(conn, &room).await?;
        self.transport
            .emit_to_room(
                &room,
                INTERPRETER_LEFT,
                EventPayload::json(&InterpreterLeftNotice {
                    connection_id: conn.clone(),
                    interpreter: Some(interpreter),
                })?,
            )
            .await?;

        if let Some(active) =
            get_json::<ActiveBoothRecord>(self.kv.as_ref(), ActiveBoothKey::booth(booth)).await?
        {
            if active.connection_id == *conn {
                self.delete_active_records(booth, conn).await?;
                self.broadcast_stopped(booth).await?;
                info!(connection = %conn, booth = %booth, "booth released by leaving holder");
            }
        }

        debug!(connection = %conn, booth = %booth, "left booth");
        self.track_booth_event(INTERPRETER_LEFT, booth, &packet, conn);
        Ok(())
    }

    /// Signals readiness to take the booth. No state change.
    ///
    /// # Errors
    ///
    /// Same authorization as [`BoothService::join`].
    pub async fn accept(&self, conn: &ConnectionId, booth: &BoothId) -> Result<()> {
        let (packet, interpreter) = self.authorize(conn, booth).await?;
        self.transport
            .emit_to_room(
                &booth.interpret_room(),
                INTERPRETER_ACCEPTED,
                EventPayload::json(&InterpreterNotice {
                    connection_id: conn.clone(),
                    interpreter,
                })?,
            )
            .await?;
        self.track_booth_event(INTERPRETER_ACCEPTED, booth, &packet, conn);
        Ok(())
    }

    /// Goes live on the booth, displacing any current holder.
    ///
    /// The displaced holder gets a targeted takeover notice; the record is
    /// then replaced with a plain write. The previous holder's reverse
    /// record is left to its own disconnect or stop.
    ///
    /// # Errors
    ///
    /// Same authorization as [`BoothService::join`].
    pub async fn start(&self, conn: &ConnectionId, booth: &BoothId) -> Result<()> {
        let (packet, interpreter) = self.authorize(conn, booth).await?;
        let key = ActiveBoothKey::booth(booth);

        if let Some(previous) = get_json::<ActiveBoothRecord>(self.kv.as_ref(), &key).await? {
            if previous.connection_id != *conn {
                self.transport
                    .emit_to_connection(
                        &previous.connection_id,
                        INTERPRETER_TAKEOVER,
                        EventPayload::json(&InterpreterNotice {
                            connection_id: conn.clone(),
                            interpreter: interpreter.clone(),
                        })?,
                    )
                    .await?;
                record_booth_takeover();
                info!(
                    booth = %booth,
                    displaced = %previous.connection_id,
                    connection = %conn,
                    "booth takeover"
                );
            }
        }

        let record = ActiveBoothRecord {
            connection_id: conn.clone(),
            attendee_subject_id: packet.claims.subject.clone(),
            interpreter: interpreter.clone(),
        };
        put_json(self.kv.as_ref(), &key, &record).await?;
        put_json(
            self.kv.as_ref(),
            &ActiveInterpreterKey::connection(conn),
            &ActiveInterpreterRecord {
                booth: booth.clone(),
            },
        )
        .await?;

        self.transport
            .emit_to_room(
                &booth.interpret_room(),
                INTERPRETER_STARTED,
                EventPayload::json(&InterpreterNotice {
                    connection_id: conn.clone(),
                    interpreter,
                })?,
            )
            .await?;
        self.transport
            .emit_to_room(&booth.channel_room(), CHANNEL_STARTED, EventPayload::json(booth)?)
            .await?;

        info!(connection = %conn, booth = %booth, "interpretation started");
        self.track_booth_event(INTERPRETER_STARTED, booth, &packet, conn);
        Ok(())
    }

    /// Ends the booth's live interpretation, whoever holds it.
    ///
    /// Stopping an Empty booth still broadcasts the stopped notices, so a
    /// retry after a disconnect race settles clients into the same state.
    ///
    /// # Errors
    ///
    /// Same authorization as [`BoothService::join`], plus
    /// [`Error::Unauthorized`] when [`policy::may_stop_booth`] denies the
    /// caller.
    pub async fn stop(&self, conn: &ConnectionId, booth: &BoothId) -> Result<()> {
        let (packet, _interpreter) = self.authorize(conn, booth).await?;
        if !policy::may_stop_booth(&packet) {
            return Err(Error::unauthorized(format!(
                "connection '{conn}' may not stop booth '{booth}'"
            )));
        }

        // The holder's connection comes from the record, not the caller:
        // anyone may stop, so the reverse record to clear is the holder's.
        let key = ActiveBoothKey::booth(booth);
        if let Some(active) = get_json::<ActiveBoothRecord>(self.kv.as_ref(), &key).await? {
            self.delete_active_records(booth, &active.connection_id)
                .await?;
            info!(
                connection = %conn,
                holder = %active.connection_id,
                booth = %booth,
                "interpretation stopped"
            );
        }
        self.broadcast_stopped(booth).await?;
        Ok(())
    }

    /// Relays a coordination message to the booth. No state change.
    ///
    /// # Errors
    ///
    /// Same authorization as [`BoothService::join`].
    pub async fn message(&self, conn: &ConnectionId, booth: &BoothId, text: &str) -> Result<()> {
        let (_packet, interpreter) = self.authorize(conn, booth).await?;
        self.transport
            .emit_to_room(
                &booth.interpret_room(),
                INTERPRETER_MESSAGE,
                EventPayload::json(&BoothMessageNotice {
                    connection_id: conn.clone(),
                    interpreter,
                    text: text.to_string(),
                })?,
            )
            .await?;
        Ok(())
    }

    /// Asks the booth for a relief interpreter.
    ///
    /// # Errors
    ///
    /// Same authorization as [`BoothService::join`].
    pub async fn request(
        &self,
        conn: &ConnectionId,
        booth: &BoothId,
        duration_seconds: u64,
    ) -> Result<()> {
        let (packet, interpreter) = self.authorize(conn, booth).await?;
        self.transport
            .emit_to_room(
                &booth.interpret_room(),
                INTERPRETER_REQUESTED,
                EventPayload::json(&InterpreterRequestNotice {
                    connection_id: conn.clone(),
                    interpreter,
                    duration_seconds,
                })?,
            )
            .await?;
        self.events.track(
            INTERPRETER_REQUESTED,
            json!({
                "sessionId": booth.session.as_str(),
                "channel": booth.channel.as_str(),
                "durationSeconds": duration_seconds,
            }),
            TrackContext::authenticated(&packet.claims.subject, conn),
        );
        Ok(())
    }

    /// Best-effort cleanup when a connection drops, whatever the cause.
    ///
    /// Releases the booth the connection was actively working (unless a
    /// concurrent stop or takeover already moved it on), then leaves every
    /// interpret room with a left notice. Never fails; errors are logged.
    pub async fn connection_closed(&self, conn: &ConnectionId) {
        if let Err(e) = self.release_on_disconnect(conn).await {
            warn!(connection = %conn, error = %e, "disconnect cleanup: booth release failed");
        }
        if let Err(e) = self.leave_all_booths(conn).await {
            warn!(connection = %conn, error = %e, "disconnect cleanup: room leave failed");
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Shared prologue: registered interpreter plus a known session.
    async fn authorize(
        &self,
        conn: &ConnectionId,
        booth: &BoothId,
    ) -> Result<(SocketAuthPacket, InterpreterRecord)> {
        let identity = self.auth.resolve_interpreter(conn).await?;
        if self
            .sessions
            .find_session(&booth.session)
            .await?
            .is_none()
        {
            return Err(Error::not_found(format!(
                "unknown session '{}'",
                booth.session
            )));
        }
        Ok(identity)
    }

    async fn roster_excluding(
        &self,
        conn: &ConnectionId,
        room: &RoomName,
    ) -> Result<Vec<BoothOccupant>> {
        let members = self.transport.members(room).await?;
        let lookups = members
            .into_iter()
            .filter(|member| member != conn)
            .map(|member| async move {
                match self.auth.resolve(&member).await {
                    Ok(packet) => BoothOccupant {
                        connection_id: member,
                        interpreter: packet.interpreter,
                    },
                    Err(e) => {
                        debug!(connection = %member, error = %e, "roster occupant did not resolve");
                        BoothOccupant {
                            connection_id: member,
                            interpreter: None,
                        }
                    }
                }
            });
        Ok(join_all(lookups).await)
    }

    async fn delete_active_records(&self, booth: &BoothId, holder: &ConnectionId) -> Result<()> {
        self.kv
            .delete(ActiveBoothKey::booth(booth).as_ref())
            .await?;
        self.kv
            .delete(ActiveInterpreterKey::connection(holder).as_ref())
            .await
    }

    async fn broadcast_stopped(&self, booth: &BoothId) -> Result<()> {
        self.transport
            .emit_to_room(
                &booth.interpret_room(),
                INTERPRETER_STOPPED,
                EventPayload::json(booth)?,
            )
            .await?;
        self.transport
            .emit_to_room(&booth.channel_room(), CHANNEL_STOPPED, EventPayload::json(booth)?)
            .await
    }

    async fn release_on_disconnect(&self, conn: &ConnectionId) -> Result<()> {
        let reverse_key = ActiveInterpreterKey::connection(conn);
        let Some(reverse) =
            get_json::<ActiveInterpreterRecord>(self.kv.as_ref(), &reverse_key).await?
        else {
            return Ok(());
        };

        let booth = reverse.booth;
        if let Some(active) =
            get_json::<ActiveBoothRecord>(self.kv.as_ref(), ActiveBoothKey::booth(&booth)).await?
        {
            // A concurrent stop or takeover may already have moved the booth
            // on; only the current holder's disconnect empties it.
            if active.connection_id == *conn {
                self.kv
                    .delete(ActiveBoothKey::booth(&booth).as_ref())
                    .await?;
                self.broadcast_stopped(&booth).await?;
                info!(connection = %conn, booth = %booth, "booth released on disconnect");
            }
        }
        self.kv.delete(reverse_key.as_ref()).await
    }

    async fn leave_all_booths(&self, conn: &ConnectionId) -> Result<()> {
        // The auth packet may already be gone; the left notice goes out
        // either way, just without an identity.
        let interpreter = match self.auth.resolve(conn).await {
            Ok(packet) => packet.interpreter,
            Err(_) => None,
        };

        for room in self.transport.rooms_of(conn).await? {
            if BoothId::from_interpret_room(&room).is_none() {
                continue;
            }
            self.transport.leave(conn, &room).await?;
            self.transport
                .emit_to_room(
                    &room,
                    INTERPRETER_LEFT,
                    EventPayload::json(&InterpreterLeftNotice {
                        connection_id: conn.clone(),
                        interpreter: interpreter.clone(),
                    })?,
                )
                .await?;
        }
        Ok(())
    }

    fn track_booth_event(
        &self,
        event: &str,
        booth: &BoothId,
        packet: &SocketAuthPacket,
        conn: &ConnectionId,
    ) {
        self.events.track(
            event,
            json!({"sessionId": booth.session.as_str(), "channel": booth.channel.as_str()}),
            TrackContext::authenticated(&packet.claims.subject, conn),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabine_core::{Channel, SessionId};

    #[test]
    fn active_booth_record_wire_format() {
        let record = ActiveBoothRecord {
            connection_id: ConnectionId::new("conn-1").unwrap(),
            attendee_subject_id: SubjectId::new("subj-1").unwrap(),
            interpreter: InterpreterRecord {
                id: 5,
                name: "Ada".to_string(),
                email: "ada@example.org".to_string(),
            },
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["connectionId"], "conn-1");
        assert_eq!(json["attendeeSubjectId"], "subj-1");
        assert_eq!(json["interpreter"]["id"], 5);
    }

    #[test]
    fn active_interpreter_record_wire_format() {
        let record = ActiveInterpreterRecord {
            booth: BoothId::new(SessionId::new("sess-1").unwrap(), Channel::Fr),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"booth":{"sessionId":"sess-1","channel":"fr"}}"#);
    }
}
