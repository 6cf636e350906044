//! Test room transport with failure injection.
//!
//! Wraps the in-memory transport from `cabine-core` so membership and
//! emission recording keep the core semantics, and adds injectable failures
//! plus optional latency.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cabine_core::{
    ConnectionId, EmittedEvent, Error, ErrorNotice, EventPayload, MemoryRoomTransport, Result,
    RoomName, RoomTransport,
};

/// In-memory room transport with failure injection.
///
/// Injected failures match both room names and connection ids by prefix, so
/// one list covers membership operations and targeted emissions alike.
#[derive(Debug, Default)]
pub struct TracingRoomTransport {
    inner: MemoryRoomTransport,
    fail_targets: Arc<Mutex<Vec<String>>>,
    latency: Option<Duration>,
}

impl TracingRoomTransport {
    /// Creates a new empty tracing transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport with simulated latency.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Injects a failure for the given room-name or connection-id prefix.
    pub fn inject_failure(&self, target: impl Into<String>) {
        self.fail_targets.lock().expect("lock").push(target.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_targets.lock().expect("lock").clear();
    }

    /// Returns all recorded emissions in order.
    #[must_use]
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.inner.events()
    }

    /// Returns recorded emissions with the given event name.
    #[must_use]
    pub fn events_named(&self, event: &str) -> Vec<EmittedEvent> {
        self.inner.events_named(event)
    }

    /// Returns recorded emissions addressed to a room.
    #[must_use]
    pub fn events_to_room(&self, room: &RoomName) -> Vec<EmittedEvent> {
        self.inner.events_to_room(room)
    }

    /// Returns recorded emissions addressed to a single connection.
    #[must_use]
    pub fn events_to_connection(&self, connection: &ConnectionId) -> Vec<EmittedEvent> {
        self.inner.events_to_connection(connection)
    }

    /// Clears recorded emissions, keeping membership intact.
    pub fn clear_events(&self) {
        self.inner.clear_events();
    }

    /// Returns whether a connection is currently in a room.
    #[must_use]
    pub fn is_member(&self, connection: &ConnectionId, room: &RoomName) -> bool {
        self.inner.is_member(connection, room)
    }

    fn check_failure(&self, target: &str) -> Result<()> {
        let fail_targets = self.fail_targets.lock().expect("lock");
        if fail_targets.iter().any(|p| target.starts_with(p)) {
            return Err(Error::Transport {
                message: format!("injected failure for target: {target}"),
            });
        }
        Ok(())
    }

    async fn maybe_delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait::async_trait]
impl RoomTransport for TracingRoomTransport {
    async fn join(&self, connection: &ConnectionId, room: &RoomName) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(room.as_str())?;
        self.inner.join(connection, room).await
    }

    async fn leave(&self, connection: &ConnectionId, room: &RoomName) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(room.as_str())?;
        self.inner.leave(connection, room).await
    }

    async fn emit_to_connection(
        &self,
        connection: &ConnectionId,
        event: &str,
        payload: EventPayload,
    ) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(connection.as_str())?;
        self.inner.emit_to_connection(connection, event, payload).await
    }

    async fn emit_to_room(
        &self,
        room: &RoomName,
        event: &str,
        payload: EventPayload,
    ) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(room.as_str())?;
        self.inner.emit_to_room(room, event, payload).await
    }

    async fn emit_to_all(&self, event: &str, payload: EventPayload) -> Result<()> {
        self.maybe_delay().await;
        self.inner.emit_to_all(event, payload).await
    }

    async fn members(&self, room: &RoomName) -> Result<Vec<ConnectionId>> {
        self.maybe_delay().await;
        self.check_failure(room.as_str())?;
        self.inner.members(room).await
    }

    async fn rooms_of(&self, connection: &ConnectionId) -> Result<Vec<RoomName>> {
        self.maybe_delay().await;
        self.check_failure(connection.as_str())?;
        self.inner.rooms_of(connection).await
    }

    async fn send_error(&self, connection: &ConnectionId, notice: &ErrorNotice) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(connection.as_str())?;
        self.inner.send_error(connection, notice).await
    }
}
