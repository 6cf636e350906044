//! Collaborator traits for the platform services next to the live layer.
//!
//! The coordination layer does not own identity, the interpreter roster,
//! session metadata, analytics, or archival storage. Each of those lives in
//! an adjacent platform service; this module defines the narrow trait each
//! collaborator is consumed through, so production wiring and test fakes
//! stay interchangeable.

use std::collections::BTreeSet;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use cabine_core::{ConnectionId, Result, SessionId, SubjectId};

// ============================================================================
// Identity
// ============================================================================

/// Verified claims extracted from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    /// Stable subject identifier from the token.
    #[serde(rename = "subjectId")]
    pub subject: SubjectId,
    /// Role names granted to the subject.
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// Preferred locale, when the token carries one.
    #[serde(default)]
    pub locale: Option<String>,
}

impl UserClaims {
    /// Claims carrying only a subject.
    #[must_use]
    pub fn for_subject(subject: SubjectId) -> Self {
        Self {
            subject,
            roles: BTreeSet::new(),
            locale: None,
        }
    }
}

/// Token verification and account lookup.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    /// Verifies a bearer token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`cabine_core::Error::Unauthorized`] for expired, malformed,
    /// or unsigned tokens.
    async fn verify_token(&self, token: &str) -> Result<UserClaims>;

    /// Looks up the registered account email for a subject.
    ///
    /// Returns `None` when the subject has no account on record.
    async fn registered_email(&self, subject: &SubjectId) -> Result<Option<String>>;
}

// ============================================================================
// Interpreter directory
// ============================================================================

/// An interpreter known to the platform directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterRecord {
    /// Directory row identifier.
    pub id: i64,
    /// Display name shown to booth peers.
    pub name: String,
    /// Registered email, matched against the authenticated account.
    pub email: String,
}

/// Lookup into the registered-interpreter roster.
#[async_trait]
pub trait InterpreterDirectory: Send + Sync + 'static {
    /// Finds the interpreter registered under `email`, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<InterpreterRecord>>;
}

// ============================================================================
// Sessions
// ============================================================================

/// Conference-session metadata relevant to interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Session identifier.
    pub id: SessionId,
    /// Whether live interpretation is switched on for this session.
    #[serde(rename = "enableInterpretation")]
    pub interpretation_enabled: bool,
}

/// Lookup into the conference programme.
#[async_trait]
pub trait SessionDirectory: Send + Sync + 'static {
    /// Loads session metadata by id. Returns `None` for unknown sessions.
    async fn find_session(&self, session: &SessionId) -> Result<Option<SessionInfo>>;
}

// ============================================================================
// Analytics
// ============================================================================

/// Actor context attached to an analytics event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackContext {
    /// Authenticated subject behind the event, when known.
    pub subject: Option<SubjectId>,
    /// Connection that caused the event, when known.
    pub connection: Option<ConnectionId>,
}

impl TrackContext {
    /// Context for an authenticated connection.
    #[must_use]
    pub fn authenticated(subject: &SubjectId, connection: &ConnectionId) -> Self {
        Self {
            subject: Some(subject.clone()),
            connection: Some(connection.clone()),
        }
    }

    /// Context for a connection whose subject is unknown.
    #[must_use]
    pub fn connection(connection: &ConnectionId) -> Self {
        Self {
            subject: None,
            connection: Some(connection.clone()),
        }
    }
}

/// Fire-and-forget analytics sink.
///
/// Calls must not block the caller: delivery happens out of band and
/// failures stay inside the sink.
pub trait EventSink: Send + Sync + 'static {
    /// Records one named event with a JSON payload.
    fn track(&self, event: &str, payload: serde_json::Value, context: TrackContext);
}

// ============================================================================
// Archival
// ============================================================================

/// Durable object storage for relayed audio chunks.
#[async_trait]
pub trait ArchiveStore: Send + Sync + 'static {
    /// Uploads one chunk under the given storage key.
    async fn upload(&self, key: &str, bytes: Bytes) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_claims_wire_format() {
        let claims = UserClaims::for_subject(SubjectId::new("subj-1").unwrap());
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"subjectId": "subj-1", "roles": [], "locale": null})
        );
    }

    #[test]
    fn user_claims_tolerates_missing_optionals() {
        let claims: UserClaims = serde_json::from_str(r#"{"subjectId":"subj-2"}"#).unwrap();
        assert_eq!(claims.subject.as_str(), "subj-2");
        assert!(claims.roles.is_empty());
        assert!(claims.locale.is_none());
    }

    #[test]
    fn session_info_wire_format() {
        let info = SessionInfo {
            id: SessionId::new("sess-9").unwrap(),
            interpretation_enabled: true,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"id":"sess-9","enableInterpretation":true}"#);
    }

    #[test]
    fn interpreter_record_wire_format() {
        let rec = InterpreterRecord {
            id: 7,
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"id":7,"name":"Ada","email":"ada@example.org"}"#);
    }

    #[test]
    fn track_context_constructors() {
        let subject = SubjectId::new("subj-3").unwrap();
        let conn = ConnectionId::new("conn-3").unwrap();

        let authed = TrackContext::authenticated(&subject, &conn);
        assert_eq!(authed.subject, Some(subject));
        assert_eq!(authed.connection, Some(conn.clone()));

        let anon = TrackContext::connection(&conn);
        assert!(anon.subject.is_none());
        assert_eq!(anon.connection, Some(conn));
    }
}
