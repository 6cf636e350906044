//! Booth identity and derived room names.
//!
//! A booth is the (session, channel) pair every coordination operation is
//! scoped to. The two room names a booth projects onto the transport are
//! derived here and nowhere else, so call sites cannot drift apart:
//!
//! | Room | Format | Members |
//! |------|--------|---------|
//! | interpret | `interpret/{session}/{channel}` | interpreters working the booth |
//! | channel | `channel/{session}/{channel}` | listeners tuned to the language |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::id::SessionId;
use crate::transport::RoomName;

/// Room-name prefix shared by all interpret rooms.
pub const INTERPRET_ROOM_PREFIX: &str = "interpret/";

/// Room-name prefix shared by all channel rooms.
pub const CHANNEL_ROOM_PREFIX: &str = "channel/";

// ============================================================================
// Channel
// ============================================================================

/// A target interpretation language.
///
/// The set is closed: the platform offers a fixed list of booth languages,
/// and store keys, room names, and wire payloads all assume one of these
/// codes. Unknown codes are rejected at the edge as bad requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// English.
    En,
    /// French.
    Fr,
    /// German.
    De,
    /// Spanish.
    Es,
    /// Japanese.
    Ja,
}

impl Channel {
    /// Every channel the platform offers.
    pub const ALL: [Self; 5] = [Self::En, Self::Fr, Self::De, Self::Es, Self::Ja];

    /// Returns the lowercase language code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Es => "es",
            Self::Ja => "ja",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "en" => Ok(Self::En),
            "fr" => Ok(Self::Fr),
            "de" => Ok(Self::De),
            "es" => Ok(Self::Es),
            "ja" => Ok(Self::Ja),
            other => Err(Error::BadRequest(format!("unknown channel '{other}'"))),
        }
    }
}

// ============================================================================
// BoothId
// ============================================================================

/// Identifies one interpretation booth: a session plus a target channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothId {
    /// The session being interpreted.
    #[serde(rename = "sessionId")]
    pub session: SessionId,
    /// The target language channel.
    pub channel: Channel,
}

impl BoothId {
    /// Creates a booth id.
    #[must_use]
    pub fn new(session: SessionId, channel: Channel) -> Self {
        Self { session, channel }
    }

    /// Room joined by interpreters working this booth.
    #[must_use]
    pub fn interpret_room(&self) -> RoomName {
        RoomName::new(format!(
            "{INTERPRET_ROOM_PREFIX}{}/{}",
            self.session, self.channel
        ))
    }

    /// Room joined by listeners tuned to this booth's channel.
    #[must_use]
    pub fn channel_room(&self) -> RoomName {
        RoomName::new(format!(
            "{CHANNEL_ROOM_PREFIX}{}/{}",
            self.session, self.channel
        ))
    }

    /// Recovers a booth id from an interpret room name.
    ///
    /// Returns `None` for rooms outside the `interpret/` family. Used by
    /// disconnect cleanup, which only knows the rooms a connection was in.
    #[must_use]
    pub fn from_interpret_room(room: &RoomName) -> Option<Self> {
        let rest = room.as_ref().strip_prefix(INTERPRET_ROOM_PREFIX)?;
        let (session, channel) = rest.split_once('/')?;
        let session = SessionId::new(session).ok()?;
        let channel = channel.parse().ok()?;
        Some(Self { session, channel })
    }
}

impl fmt::Display for BoothId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.session, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booth() -> BoothId {
        BoothId::new(SessionId::new("sess-42").unwrap(), Channel::En)
    }

    #[test]
    fn room_name_formats() {
        let booth = booth();
        assert_eq!(booth.interpret_room().as_ref(), "interpret/sess-42/en");
        assert_eq!(booth.channel_room().as_ref(), "channel/sess-42/en");
    }

    #[test]
    fn display_format() {
        assert_eq!(booth().to_string(), "sess-42/en");
    }

    #[test]
    fn interpret_room_roundtrip() {
        let booth = booth();
        let recovered = BoothId::from_interpret_room(&booth.interpret_room()).unwrap();
        assert_eq!(recovered, booth);
    }

    #[test]
    fn channel_room_is_not_an_interpret_room() {
        assert!(BoothId::from_interpret_room(&booth().channel_room()).is_none());
    }

    #[test]
    fn channel_codes_roundtrip() {
        for channel in Channel::ALL {
            let parsed: Channel = channel.as_str().parse().unwrap();
            assert_eq!(parsed, channel);
        }
    }

    #[test]
    fn unknown_channel_is_bad_request() {
        let err = "klingon".parse::<Channel>().unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn booth_id_wire_format() {
        let json = serde_json::to_string(&booth()).unwrap();
        assert_eq!(json, r#"{"sessionId":"sess-42","channel":"en"}"#);
    }
}
