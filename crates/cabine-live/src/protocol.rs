//! Wire protocol: client events in, typed notices out.
//!
//! Inbound control frames are JSON documents tagged with a `type` field and
//! decoded into [`ClientEvent`]. Outbound traffic is a named event plus a
//! typed notice payload; the names are fixed here so the client and the
//! services cannot drift apart. Audio travels as raw binary frames and never
//! appears in this enum.

use serde::{Deserialize, Serialize};

use cabine_core::ConnectionId;

use crate::directory::InterpreterRecord;

// ============================================================================
// Event names: interpret room
// ============================================================================

/// Targeted to a joining interpreter: who is already in the booth.
pub const INTERPRETER_ROSTER: &str = "interpreter-roster";

/// An interpreter joined the booth room. Also the tracking event name.
pub const INTERPRETER_JOINED: &str = "interpreter-joined";

/// An interpreter left the booth room. Also the tracking event name.
pub const INTERPRETER_LEFT: &str = "interpreter-left";

/// An interpreter signalled they are ready to take the booth.
pub const INTERPRETER_ACCEPTED: &str = "interpreter-accepted";

/// An interpreter went live on the booth.
pub const INTERPRETER_STARTED: &str = "interpreter-started";

/// The booth's live interpretation ended.
pub const INTERPRETER_STOPPED: &str = "interpreter-stopped";

/// Targeted to a displaced holder: someone else took the booth.
pub const INTERPRETER_TAKEOVER: &str = "interpreter-takeover";

/// Free-text coordination message between booth occupants.
pub const INTERPRETER_MESSAGE: &str = "interpreter-message";

/// A relief interpreter was requested for the booth.
pub const INTERPRETER_REQUESTED: &str = "interpreter-requested";

// ============================================================================
// Event names: channel room
// ============================================================================

/// Interpretation on this channel went live.
pub const CHANNEL_STARTED: &str = "channel-started";

/// Interpretation on this channel ended.
pub const CHANNEL_STOPPED: &str = "channel-stopped";

/// One binary audio chunk from the active interpreter.
pub const CHANNEL_DATA: &str = "channel-data";

// ============================================================================
// Event names: presence and tracking
// ============================================================================

/// Aggregate visitor count for the whole site.
pub const SITE_VISITORS: &str = "site-visitors";

/// Tracking event: a listener joined a channel room.
pub const CHANNEL_JOINED: &str = "channel-joined";

/// Tracking event: a listener left a channel room.
pub const CHANNEL_LEFT: &str = "channel-left";

// ============================================================================
// Notices
// ============================================================================

/// Identity of an interpreter acting on a booth.
///
/// Payload of `interpreter-joined`, `interpreter-accepted`,
/// `interpreter-started`, and the targeted `interpreter-takeover`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterNotice {
    /// Connection the interpreter is acting from.
    pub connection_id: ConnectionId,
    /// The interpreter's directory entry.
    pub interpreter: InterpreterRecord,
}

/// Payload of `interpreter-left`.
///
/// Disconnect cleanup fires this after the auth packet may already be gone,
/// so the identity is best effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterLeftNotice {
    /// Connection that left.
    pub connection_id: ConnectionId,
    /// The leaver's directory entry, when still resolvable.
    #[serde(default)]
    pub interpreter: Option<InterpreterRecord>,
}

/// One occupant of an interpret room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothOccupant {
    /// The occupant's connection.
    pub connection_id: ConnectionId,
    /// The occupant's directory entry, when their auth packet resolves.
    #[serde(default)]
    pub interpreter: Option<InterpreterRecord>,
}

/// Payload of the targeted `interpreter-roster` notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterNotice {
    /// Everyone already in the room, excluding the joiner.
    pub occupants: Vec<BoothOccupant>,
}

/// Payload of `interpreter-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothMessageNotice {
    /// Connection the message came from.
    pub connection_id: ConnectionId,
    /// The sender's directory entry.
    pub interpreter: InterpreterRecord,
    /// Message body, relayed verbatim.
    pub text: String,
}

/// Payload of `interpreter-requested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterRequestNotice {
    /// Connection the request came from.
    pub connection_id: ConnectionId,
    /// The requester's directory entry.
    pub interpreter: InterpreterRecord,
    /// Requested shift length in seconds.
    pub duration_seconds: u64,
}

/// Payload of `site-visitors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorCount {
    /// Number of connections currently in the site room.
    pub count: usize,
}

// ============================================================================
// Client events
// ============================================================================

/// A control frame sent by a client.
///
/// Booth-scoped events carry the raw session id and channel code; the
/// coordinator validates both before any service runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Bind a verified identity to this connection.
    Authenticate {
        /// Bearer token to verify.
        token: String,
    },
    /// Drop this connection's identity binding.
    Logout,
    /// Start listening to a booth's channel room.
    JoinChannel {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
    },
    /// Stop listening to a booth's channel room.
    LeaveChannel {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
    },
    /// Enter a booth's interpret room.
    JoinBooth {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
    },
    /// Leave a booth's interpret room.
    LeaveBooth {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
    },
    /// Signal readiness to take the booth.
    AcceptInterpret {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
    },
    /// Go live on the booth, displacing any current holder.
    StartInterpret {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
    },
    /// End the booth's live interpretation.
    StopInterpret {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
    },
    /// Send a coordination message to the booth.
    BoothMessage {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
        /// Message body.
        text: String,
    },
    /// Ask for a relief interpreter.
    RequestInterpreter {
        /// Session being interpreted.
        session_id: String,
        /// Target language code.
        channel: String,
        /// Requested shift length in seconds.
        duration_seconds: u64,
    },
}

impl ClientEvent {
    /// Wire name of this event's `type` tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Authenticate { .. } => "authenticate",
            Self::Logout => "logout",
            Self::JoinChannel { .. } => "join-channel",
            Self::LeaveChannel { .. } => "leave-channel",
            Self::JoinBooth { .. } => "join-booth",
            Self::LeaveBooth { .. } => "leave-booth",
            Self::AcceptInterpret { .. } => "accept-interpret",
            Self::StartInterpret { .. } => "start-interpret",
            Self::StopInterpret { .. } => "stop-interpret",
            Self::BoothMessage { .. } => "booth-message",
            Self::RequestInterpreter { .. } => "request-interpreter",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_event_parses_tagged_frames() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"join-booth","sessionId":"sess-1","channel":"en"}"#)
                .unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinBooth {
                session_id: "sess-1".to_string(),
                channel: "en".to_string(),
            }
        );

        let event: ClientEvent =
            serde_json::from_str(r#"{"type":"authenticate","token":"tok-1"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Authenticate {
                token: "tok-1".to_string()
            }
        );

        let event: ClientEvent = serde_json::from_str(r#"{"type":"logout"}"#).unwrap();
        assert_eq!(event, ClientEvent::Logout);
    }

    #[test]
    fn client_event_carries_camel_case_fields() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"request-interpreter","sessionId":"sess-2","channel":"fr","durationSeconds":900}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ClientEvent::RequestInterpreter {
                session_id: "sess-2".to_string(),
                channel: "fr".to_string(),
                duration_seconds: 900,
            }
        );
    }

    #[test]
    fn client_event_rejects_unknown_type() {
        let result = serde_json::from_str::<ClientEvent>(r#"{"type":"shout","text":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn notices_serialize_camel_case() {
        let notice = InterpreterRequestNotice {
            connection_id: ConnectionId::new("conn-1").unwrap(),
            interpreter: InterpreterRecord {
                id: 3,
                name: "Ada".to_string(),
                email: "ada@example.org".to_string(),
            },
            duration_seconds: 600,
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["connectionId"], "conn-1");
        assert_eq!(json["durationSeconds"], 600);
        assert_eq!(json["interpreter"]["name"], "Ada");
    }

    #[test]
    fn visitor_count_wire_format() {
        let json = serde_json::to_string(&VisitorCount { count: 12 }).unwrap();
        assert_eq!(json, r#"{"count":12}"#);
    }

    #[test]
    fn event_name_matches_wire_tag() {
        let event = ClientEvent::StartInterpret {
            session_id: "sess-1".to_string(),
            channel: "en".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
    }
}
