//! The coordinator: one object for the socket adapter to talk to.
//!
//! A transport adapter owns the actual sockets and maps frames onto this
//! type: decoded [`ClientEvent`]s to [`Coordinator::handle_event`], raw
//! binary frames to [`Coordinator::handle_audio`], connect and disconnect
//! hooks to the lifecycle methods. Operation failures are relayed to the
//! originating connection as `error` events and never escape to the
//! adapter, so one bad frame cannot take a socket loop down.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn, Instrument};

use cabine_core::observability::{booth_span, connection_span};
use cabine_core::{
    BoothId, Channel, ConnectionId, Error, ErrorNotice, KvStore, LockService, Result,
    RoomTransport, SessionId,
};

use crate::audio::AudioRelay;
use crate::auth::AuthBinding;
use crate::booth::BoothService;
use crate::channel::ChannelService;
use crate::config::LiveConfig;
use crate::directory::{
    ArchiveStore, EventSink, IdentityVerifier, InterpreterDirectory, SessionDirectory,
};
use crate::presence::PresenceService;
use crate::protocol::ClientEvent;

/// Everything the coordinator needs from the surrounding system.
#[derive(Clone)]
pub struct Collaborators {
    /// Shared key-value store, the system of record.
    pub kv: Arc<dyn KvStore>,
    /// Room broadcast transport.
    pub rooms: Arc<dyn RoomTransport>,
    /// Token verification and account lookup.
    pub identity: Arc<dyn IdentityVerifier>,
    /// Registered-interpreter roster.
    pub interpreters: Arc<dyn InterpreterDirectory>,
    /// Conference programme.
    pub sessions: Arc<dyn SessionDirectory>,
    /// Analytics sink.
    pub events: Arc<dyn EventSink>,
    /// Durable audio archive.
    pub archive: Arc<dyn ArchiveStore>,
}

/// Routes client traffic to the coordination services.
#[derive(Clone)]
pub struct Coordinator {
    transport: Arc<dyn RoomTransport>,
    auth: AuthBinding,
    channels: ChannelService,
    booths: BoothService,
    audio: AudioRelay,
    presence: PresenceService,
}

impl Coordinator {
    /// Wires the full service stack over the given collaborators.
    #[must_use]
    pub fn new(config: LiveConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            kv,
            rooms,
            identity,
            interpreters,
            sessions,
            events,
            archive,
        } = collaborators;

        let auth = AuthBinding::new(
            Arc::clone(&kv),
            identity,
            interpreters,
            config.auth_ttl(),
        );
        let channels = ChannelService::new(
            Arc::clone(&rooms),
            auth.clone(),
            Arc::clone(&sessions),
            Arc::clone(&events),
        );
        let booths = BoothService::new(
            Arc::clone(&kv),
            Arc::clone(&rooms),
            auth.clone(),
            sessions,
            events,
        );
        let audio = AudioRelay::new(Arc::clone(&kv), Arc::clone(&rooms), archive);
        let lock = LockService::new(kv, config.hostname.clone());
        let presence = PresenceService::new(Arc::clone(&rooms), lock, &config);

        info!(hostname = %config.hostname, "live coordinator ready");
        Self {
            transport: rooms,
            auth,
            channels,
            booths,
            audio,
            presence,
        }
    }

    /// Lifecycle hook: a connection was established.
    pub async fn connection_opened(&self, conn: &ConnectionId) {
        if let Err(e) = self.presence.came_online(conn).await {
            warn!(connection = %conn, error = %e, "presence join failed");
        }
    }

    /// Handles one decoded control frame.
    ///
    /// Failures are relayed to `conn` as an `error` event; nothing is
    /// returned to the adapter.
    pub async fn handle_event(&self, conn: &ConnectionId, event: ClientEvent) {
        let span = event_span(conn, &event);
        if let Err(e) = self.dispatch(conn, event).instrument(span).await {
            self.relay_error(conn, &e).await;
        }
    }

    /// Handles one raw binary audio frame.
    pub async fn handle_audio(&self, conn: &ConnectionId, chunk: Bytes) {
        if let Err(e) = self.audio.relay(conn, chunk).await {
            self.relay_error(conn, &e).await;
        }
    }

    /// Lifecycle hook: a connection dropped, for whatever reason.
    pub async fn connection_closed(&self, conn: &ConnectionId) {
        self.booths.connection_closed(conn).await;
        if let Err(e) = self.presence.went_offline(conn).await {
            warn!(connection = %conn, error = %e, "presence leave failed");
        }
    }

    async fn dispatch(&self, conn: &ConnectionId, event: ClientEvent) -> Result<()> {
        match event {
            ClientEvent::Authenticate { token } => {
                self.auth.bind(conn, &token).await?;
                Ok(())
            }
            ClientEvent::Logout => self.auth.unbind(conn).await,
            ClientEvent::JoinChannel {
                session_id,
                channel,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.channels.join(conn, &booth).await
            }
            ClientEvent::LeaveChannel {
                session_id,
                channel,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.channels.leave(conn, &booth).await
            }
            ClientEvent::JoinBooth {
                session_id,
                channel,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.booths.join(conn, &booth).await
            }
            ClientEvent::LeaveBooth {
                session_id,
                channel,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.booths.leave(conn, &booth).await
            }
            ClientEvent::AcceptInterpret {
                session_id,
                channel,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.booths.accept(conn, &booth).await
            }
            ClientEvent::StartInterpret {
                session_id,
                channel,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.booths.start(conn, &booth).await
            }
            ClientEvent::StopInterpret {
                session_id,
                channel,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.booths.stop(conn, &booth).await
            }
            ClientEvent::BoothMessage {
                session_id,
                channel,
                text,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.booths.message(conn, &booth, &text).await
            }
            ClientEvent::RequestInterpreter {
                session_id,
                channel,
                duration_seconds,
            } => {
                let booth = parse_booth(&session_id, &channel)?;
                self.booths.request(conn, &booth, duration_seconds).await
            }
        }
    }

    async fn relay_error(&self, conn: &ConnectionId, error: &Error) {
        warn!(
            connection = %conn,
            code = error.wire_code(),
            error = %error,
            "operation failed"
        );
        let notice = ErrorNotice::from(error);
        if let Err(send_err) = self.transport.send_error(conn, &notice).await {
            warn!(connection = %conn, error = %send_err, "error notice delivery failed");
        }
    }
}

fn parse_booth(session_id: &str, channel: &str) -> Result<BoothId> {
    let session = SessionId::new(session_id)?;
    let channel = channel.parse::<Channel>()?;
    Ok(BoothId::new(session, channel))
}

fn event_span(conn: &ConnectionId, event: &ClientEvent) -> tracing::Span {
    use ClientEvent::{
        AcceptInterpret, Authenticate, BoothMessage, JoinBooth, JoinChannel, LeaveBooth,
        LeaveChannel, Logout, RequestInterpreter, StartInterpret, StopInterpret,
    };
    match event {
        Authenticate { .. } | Logout => connection_span(event.name(), conn.as_str()),
        JoinChannel {
            session_id,
            channel,
        }
        | LeaveChannel {
            session_id,
            channel,
        }
        | JoinBooth {
            session_id,
            channel,
        }
        | LeaveBooth {
            session_id,
            channel,
        }
        | AcceptInterpret {
            session_id,
            channel,
        }
        | StartInterpret {
            session_id,
            channel,
        }
        | StopInterpret {
            session_id,
            channel,
        }
        | BoothMessage {
            session_id,
            channel,
            ..
        }
        | RequestInterpreter {
            session_id,
            channel,
            ..
        } => booth_span(event.name(), session_id, channel),
    }
}
