//! Room-scoped broadcast transport abstraction.
//!
//! The transport is the coordination layer's second external dependency, next
//! to the key-value store: a membership-plus-fan-out fabric, in production a
//! socket server with room support. Cabine never addresses client protocols
//! directly; it joins and leaves rooms and emits named events.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::id::ConnectionId;

// ============================================================================
// Names and payloads
// ============================================================================

/// Name of a broadcast room.
///
/// Booth-scoped rooms are derived by [`BoothId`](crate::booth::BoothId);
/// feature-level rooms (site presence) use well-known constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a room name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload of an emitted event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    /// A JSON document.
    Json(serde_json::Value),
    /// An opaque binary frame (audio chunks).
    Binary(Bytes),
}

impl EventPayload {
    /// Encodes a record into a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] when the value cannot be represented
    /// as JSON.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| Error::Serialization {
            message: format!("encode event payload: {e}"),
        })?;
        Ok(Self::Json(value))
    }
}

/// Error notice relayed to a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    /// Stable machine-readable code (`bad-request`, `unauthorized`, ...).
    pub code: String,
    /// Human-readable description.
    pub message: String,
}

impl From<&Error> for ErrorNotice {
    fn from(err: &Error) -> Self {
        let code = err.wire_code();
        // Infrastructure detail stays in logs; the wire gets the code only.
        let message = if code == "internal" {
            "internal error".to_string()
        } else {
            err.to_string()
        };
        Self {
            code: code.to_string(),
            message,
        }
    }
}

// ============================================================================
// Transport trait
// ============================================================================

/// Room membership and fan-out operations.
///
/// Implementations sit in front of the socket layer. All methods are remote
/// calls in production; failures surface as [`Error::Transport`].
#[async_trait]
pub trait RoomTransport: Send + Sync + 'static {
    /// Adds a connection to a room. Joining twice is a no-op.
    async fn join(&self, connection: &ConnectionId, room: &RoomName) -> Result<()>;

    /// Removes a connection from a room. Leaving a room the connection is
    /// not in is a no-op.
    async fn leave(&self, connection: &ConnectionId, room: &RoomName) -> Result<()>;

    /// Emits a named event to a single connection.
    async fn emit_to_connection(
        &self,
        connection: &ConnectionId,
        event: &str,
        payload: EventPayload,
    ) -> Result<()>;

    /// Emits a named event to every member of a room.
    async fn emit_to_room(&self, room: &RoomName, event: &str, payload: EventPayload)
        -> Result<()>;

    /// Emits a named event to every connected client.
    async fn emit_to_all(&self, event: &str, payload: EventPayload) -> Result<()>;

    /// Returns the current members of a room.
    async fn members(&self, room: &RoomName) -> Result<Vec<ConnectionId>>;

    /// Returns the rooms a connection is currently in.
    async fn rooms_of(&self, connection: &ConnectionId) -> Result<Vec<RoomName>>;

    /// Relays an error notice to a connection.
    async fn send_error(&self, connection: &ConnectionId, notice: &ErrorNotice) -> Result<()>;
}

// ============================================================================
// Memory implementation
// ============================================================================

/// Target of a recorded emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitTarget {
    /// A single connection.
    Connection(ConnectionId),
    /// Every member of a room.
    Room(RoomName),
    /// Every connected client.
    All,
}

/// An event recorded by [`MemoryRoomTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    /// Where the event was addressed.
    pub target: EmitTarget,
    /// Event name.
    pub event: String,
    /// Event payload.
    pub payload: EventPayload,
}

/// In-memory room transport for testing and local development.
///
/// Membership is tracked per room in join order; emissions are recorded
/// rather than delivered, so tests can assert on exactly what would have
/// reached clients. Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryRoomTransport {
    rooms: Arc<RwLock<HashMap<RoomName, Vec<ConnectionId>>>>,
    events: Arc<RwLock<Vec<EmittedEvent>>>,
}

impl MemoryRoomTransport {
    /// Creates a new empty transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded emissions in order.
    #[must_use]
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.events
            .read()
            .map_or_else(|_| Vec::new(), |events| events.clone())
    }

    /// Returns recorded emissions with the given event name.
    #[must_use]
    pub fn events_named(&self, event: &str) -> Vec<EmittedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event == event)
            .collect()
    }

    /// Returns recorded emissions addressed to a room.
    #[must_use]
    pub fn events_to_room(&self, room: &RoomName) -> Vec<EmittedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.target == EmitTarget::Room(room.clone()))
            .collect()
    }

    /// Returns recorded emissions addressed to a single connection.
    #[must_use]
    pub fn events_to_connection(&self, connection: &ConnectionId) -> Vec<EmittedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.target == EmitTarget::Connection(connection.clone()))
            .collect()
    }

    /// Clears recorded emissions, keeping membership intact.
    pub fn clear_events(&self) {
        if let Ok(mut events) = self.events.write() {
            events.clear();
        }
    }

    /// Returns whether a connection is currently in a room.
    #[must_use]
    pub fn is_member(&self, connection: &ConnectionId, room: &RoomName) -> bool {
        self.rooms.read().map_or(false, |rooms| {
            rooms
                .get(room)
                .is_some_and(|members| members.contains(connection))
        })
    }

    fn record(&self, target: EmitTarget, event: &str, payload: EventPayload) -> Result<()> {
        self.events
            .write()
            .map_err(|_| Error::Internal {
                message: "transport lock poisoned".into(),
            })?
            .push(EmittedEvent {
                target,
                event: event.to_string(),
                payload,
            });
        Ok(())
    }
}

#[async_trait]
impl RoomTransport for MemoryRoomTransport {
    async fn join(&self, connection: &ConnectionId, room: &RoomName) -> Result<()> {
        let mut rooms = self.rooms.write().map_err(|_| Error::Internal {
            message: "transport lock poisoned".into(),
        })?;

        let members = rooms.entry(room.clone()).or_default();
        if !members.contains(connection) {
            members.push(connection.clone());
        }
        Ok(())
    }

    async fn leave(&self, connection: &ConnectionId, room: &RoomName) -> Result<()> {
        let mut rooms = self.rooms.write().map_err(|_| Error::Internal {
            message: "transport lock poisoned".into(),
        })?;

        if let Some(members) = rooms.get_mut(room) {
            members.retain(|member| member != connection);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
        Ok(())
    }

    async fn emit_to_connection(
        &self,
        connection: &ConnectionId,
        event: &str,
        payload: EventPayload,
    ) -> Result<()> {
        self.record(EmitTarget::Connection(connection.clone()), event, payload)
    }

    async fn emit_to_room(
        &self,
        room: &RoomName,
        event: &str,
        payload: EventPayload,
    ) -> Result<()> {
        self.record(EmitTarget::Room(room.clone()), event, payload)
    }

    async fn emit_to_all(&self, event: &str, payload: EventPayload) -> Result<()> {
        self.record(EmitTarget::All, event, payload)
    }

    async fn members(&self, room: &RoomName) -> Result<Vec<ConnectionId>> {
        let rooms = self.rooms.read().map_err(|_| Error::Internal {
            message: "transport lock poisoned".into(),
        })?;
        Ok(rooms.get(room).cloned().unwrap_or_default())
    }

    async fn rooms_of(&self, connection: &ConnectionId) -> Result<Vec<RoomName>> {
        let rooms = self.rooms.read().map_err(|_| Error::Internal {
            message: "transport lock poisoned".into(),
        })?;

        let mut joined: Vec<RoomName> = rooms
            .iter()
            .filter(|(_, members)| members.contains(connection))
            .map(|(room, _)| room.clone())
            .collect();
        joined.sort();
        Ok(joined)
    }

    async fn send_error(&self, connection: &ConnectionId, notice: &ErrorNotice) -> Result<()> {
        let payload = EventPayload::json(notice)?;
        self.record(EmitTarget::Connection(connection.clone()), "error", payload)
    }
}
