//! Pre-built test fixtures for coordination tests.
//!
//! Provides static directory fakes, a recording analytics sink, an in-memory
//! archive, and a [`TestHarness`] that wires them into a full coordinator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use cabine_core::{ConnectionId, Error, LockService, Result, SessionId, SubjectId};
use cabine_live::{
    ArchiveStore, AudioRelay, AuthBinding, BoothService, ChannelService, Collaborators,
    Coordinator, EventSink, IdentityVerifier, InterpreterDirectory, InterpreterRecord, LiveConfig,
    PresenceService, SessionDirectory, SessionInfo, TrackContext, UserClaims,
};

use crate::storage::TracingKvStore;
use crate::transport::TracingRoomTransport;

static NEXT_INTERPRETER_ID: AtomicI64 = AtomicI64::new(1);

// ============================================================================
// Directory fakes
// ============================================================================

/// Identity verifier backed by seeded token and email tables.
#[derive(Debug, Default)]
pub struct StaticIdentityVerifier {
    tokens: Mutex<HashMap<String, UserClaims>>,
    emails: Mutex<HashMap<SubjectId, String>>,
}

impl StaticIdentityVerifier {
    /// Creates an empty verifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token and the claims it verifies to.
    pub fn add_token(&self, token: impl Into<String>, claims: UserClaims) {
        self.tokens.lock().expect("lock").insert(token.into(), claims);
    }

    /// Registers the account email for a subject.
    pub fn add_email(&self, subject: SubjectId, email: impl Into<String>) {
        self.emails.lock().expect("lock").insert(subject, email.into());
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify_token(&self, token: &str) -> Result<UserClaims> {
        self.tokens
            .lock()
            .expect("lock")
            .get(token)
            .cloned()
            .ok_or_else(|| Error::unauthorized(format!("unknown token '{token}'")))
    }

    async fn registered_email(&self, subject: &SubjectId) -> Result<Option<String>> {
        Ok(self.emails.lock().expect("lock").get(subject).cloned())
    }
}

/// Interpreter roster backed by a seeded email table.
#[derive(Debug, Default)]
pub struct StaticInterpreterDirectory {
    by_email: Mutex<HashMap<String, InterpreterRecord>>,
}

impl StaticInterpreterDirectory {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interpreter, keyed by email.
    pub fn add(&self, record: InterpreterRecord) {
        self.by_email
            .lock()
            .expect("lock")
            .insert(record.email.clone(), record);
    }
}

#[async_trait]
impl InterpreterDirectory for StaticInterpreterDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<InterpreterRecord>> {
        Ok(self.by_email.lock().expect("lock").get(email).cloned())
    }
}

/// Conference programme backed by a seeded session table.
#[derive(Debug, Default)]
pub struct StaticSessionDirectory {
    sessions: Mutex<HashMap<SessionId, SessionInfo>>,
}

impl StaticSessionDirectory {
    /// Creates an empty programme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session.
    pub fn add(&self, info: SessionInfo) {
        self.sessions
            .lock()
            .expect("lock")
            .insert(info.id.clone(), info);
    }
}

#[async_trait]
impl SessionDirectory for StaticSessionDirectory {
    async fn find_session(&self, session: &SessionId) -> Result<Option<SessionInfo>> {
        Ok(self.sessions.lock().expect("lock").get(session).cloned())
    }
}

// ============================================================================
// Sinks
// ============================================================================

/// One analytics event captured by [`RecordingEventSink`].
#[derive(Debug, Clone)]
pub struct TrackedEvent {
    /// Event name.
    pub name: String,
    /// Structured payload.
    pub payload: serde_json::Value,
    /// Attribution attached by the caller.
    pub context: TrackContext,
}

/// Analytics sink that records tracked events for assertions.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<TrackedEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all tracked events in order.
    #[must_use]
    pub fn events(&self) -> Vec<TrackedEvent> {
        self.events.lock().expect("lock").clone()
    }

    /// Returns tracked events with the given name.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<TrackedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }
}

impl EventSink for RecordingEventSink {
    fn track(&self, event: &str, payload: serde_json::Value, context: TrackContext) {
        self.events.lock().expect("lock").push(TrackedEvent {
            name: event.to_string(),
            payload,
            context,
        });
    }
}

/// Audio archive that keeps uploads in memory.
#[derive(Debug, Default)]
pub struct MemoryArchive {
    uploads: Mutex<Vec<(String, Bytes)>>,
    fail_keys: Mutex<Vec<String>>,
}

impl MemoryArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all uploads as key and payload pairs, in order.
    #[must_use]
    pub fn uploads(&self) -> Vec<(String, Bytes)> {
        self.uploads.lock().expect("lock").clone()
    }

    /// Injects a failure for the given key prefix.
    pub fn inject_failure(&self, key: impl Into<String>) {
        self.fail_keys.lock().expect("lock").push(key.into());
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchive {
    async fn upload(&self, key: &str, bytes: Bytes) -> Result<()> {
        let failed = self
            .fail_keys
            .lock()
            .expect("lock")
            .iter()
            .any(|p| key.starts_with(p));
        if failed {
            return Err(Error::internal(format!("injected failure for key: {key}")));
        }
        self.uploads
            .lock()
            .expect("lock")
            .push((key.to_string(), bytes));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Full coordination stack over tracing fakes.
///
/// All state lives in the shared store and transport, so the coordinator and
/// the individual service handles observe the same world. Tests drive either
/// surface: the coordinator for end-to-end event routing, the handles for
/// direct `Result` assertions.
pub struct TestHarness {
    /// Shared key-value store.
    pub kv: Arc<TracingKvStore>,
    /// Shared room transport.
    pub transport: Arc<TracingRoomTransport>,
    /// Token and email tables.
    pub identity: Arc<StaticIdentityVerifier>,
    /// Interpreter roster.
    pub interpreters: Arc<StaticInterpreterDirectory>,
    /// Conference programme.
    pub sessions: Arc<StaticSessionDirectory>,
    /// Captured analytics events.
    pub events: Arc<RecordingEventSink>,
    /// Captured audio uploads.
    pub archive: Arc<MemoryArchive>,
    /// Configuration the stack was built with.
    pub config: LiveConfig,
    /// Full event-routing facade.
    pub coordinator: Coordinator,
    /// Direct handle on the auth binding.
    pub auth: AuthBinding,
    /// Direct handle on the channel service.
    pub channels: ChannelService,
    /// Direct handle on the booth service.
    pub booths: BoothService,
    /// Direct handle on the audio relay.
    pub audio: AudioRelay,
    /// Direct handle on the presence service.
    pub presence: PresenceService,
}

impl TestHarness {
    /// Creates a harness with test-friendly timings.
    ///
    /// The presence debounce is shortened so presence tests complete in
    /// milliseconds instead of seconds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LiveConfig {
            presence_debounce_ms: 20,
            presence_lock_max_age_ms: 200,
            hostname: "test-host".to_string(),
            ..LiveConfig::default()
        })
    }

    /// Creates a harness with explicit configuration.
    #[must_use]
    pub fn with_config(config: LiveConfig) -> Self {
        let kv = Arc::new(TracingKvStore::new());
        let transport = Arc::new(TracingRoomTransport::new());
        let identity = Arc::new(StaticIdentityVerifier::new());
        let interpreters = Arc::new(StaticInterpreterDirectory::new());
        let sessions = Arc::new(StaticSessionDirectory::new());
        let events = Arc::new(RecordingEventSink::new());
        let archive = Arc::new(MemoryArchive::new());

        let collaborators = Collaborators {
            kv: kv.clone(),
            rooms: transport.clone(),
            identity: identity.clone(),
            interpreters: interpreters.clone(),
            sessions: sessions.clone(),
            events: events.clone(),
            archive: archive.clone(),
        };

        let auth = AuthBinding::new(
            Arc::clone(&collaborators.kv),
            Arc::clone(&collaborators.identity),
            Arc::clone(&collaborators.interpreters),
            config.auth_ttl(),
        );
        let channels = ChannelService::new(
            Arc::clone(&collaborators.rooms),
            auth.clone(),
            Arc::clone(&collaborators.sessions),
            Arc::clone(&collaborators.events),
        );
        let booths = BoothService::new(
            Arc::clone(&collaborators.kv),
            Arc::clone(&collaborators.rooms),
            auth.clone(),
            Arc::clone(&collaborators.sessions),
            Arc::clone(&collaborators.events),
        );
        let audio = AudioRelay::new(
            Arc::clone(&collaborators.kv),
            Arc::clone(&collaborators.rooms),
            Arc::clone(&collaborators.archive),
        );
        let lock = LockService::new(Arc::clone(&collaborators.kv), config.hostname.clone());
        let presence = PresenceService::new(Arc::clone(&collaborators.rooms), lock, &config);

        let coordinator = Coordinator::new(config.clone(), collaborators);

        Self {
            kv,
            transport,
            identity,
            interpreters,
            sessions,
            events,
            archive,
            config,
            coordinator,
            auth,
            channels,
            booths,
            audio,
            presence,
        }
    }

    /// Seeds a registered interpreter reachable through `token`.
    ///
    /// Returns the roster record for payload assertions.
    pub fn seed_interpreter(&self, token: &str, subject: &str, email: &str) -> InterpreterRecord {
        let subject = SubjectId::new(subject).expect("subject id");
        self.identity
            .add_token(token, UserClaims::for_subject(subject.clone()));
        self.identity.add_email(subject, email);

        let record = InterpreterRecord {
            id: NEXT_INTERPRETER_ID.fetch_add(1, Ordering::Relaxed),
            name: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
        };
        self.interpreters.add(record.clone());
        record
    }

    /// Seeds an authenticated attendee with no interpreter registration.
    pub fn seed_attendee(&self, token: &str, subject: &str, email: &str) -> SubjectId {
        let subject = SubjectId::new(subject).expect("subject id");
        self.identity
            .add_token(token, UserClaims::for_subject(subject.clone()));
        self.identity.add_email(subject.clone(), email);
        subject
    }

    /// Seeds a conference session.
    pub fn seed_session(&self, session: &str, interpretation_enabled: bool) -> SessionId {
        let id = SessionId::new(session).expect("session id");
        self.sessions.add(SessionInfo {
            id: id.clone(),
            interpretation_enabled,
        });
        id
    }

    /// Binds `token` to a connection and returns the connection id.
    ///
    /// Drives the same path production uses: the auth binding writes the
    /// socket-auth packet into the shared store.
    pub async fn connect(&self, conn: &str, token: &str) -> ConnectionId {
        let conn = ConnectionId::new(conn).expect("connection id");
        self.auth.bind(&conn, token).await.expect("bind");
        conn
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
