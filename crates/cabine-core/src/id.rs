//! Strongly-typed identifiers for cabine entities.
//!
//! Connection, session, and subject identifiers are minted by the surrounding
//! platform and arrive as opaque strings. Wrapping them buys two things:
//!
//! - **Strong typing**: A connection id cannot be passed where a session id
//!   is expected
//! - **Key safety**: Every id is embedded in store keys and room names, so
//!   path separators and whitespace are rejected at construction
//!
//! # Example
//!
//! ```rust
//! use cabine_core::id::{ConnectionId, SessionId};
//!
//! let conn = ConnectionId::new("sock-9M2f").unwrap();
//! let session: SessionId = "sess-42".parse().unwrap();
//!
//! assert!(ConnectionId::new("has/slash").is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

fn validate(kind: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::BadRequest(format!("{kind} must not be empty")));
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(Error::BadRequest(format!(
            "{kind} contains invalid characters: '{value}'"
        )));
    }
    Ok(())
}

/// Identifies one live socket connection.
///
/// Connection ids are assigned by the transport layer and are the unit of
/// authentication: every auth packet and reverse interpreter record is keyed
/// by one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates a connection id from a platform-supplied value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] when the value is empty or contains
    /// characters that would corrupt store keys.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate("connection id", &value)?;
        Ok(Self(value))
    }

    /// Returns the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ConnectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConnectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Identifies a conference session.
///
/// Sessions are owned by the surrounding platform; cabine only checks their
/// interpretation eligibility through the session directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session id from a platform-supplied value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] when the value is empty or contains
    /// characters that would corrupt store keys.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate("session id", &value)?;
        Ok(Self(value))
    }

    /// Returns the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Identifies an attendee, as carried in verified token claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Creates a subject id from a verified claim value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] when the value is empty or contains
    /// characters that would corrupt store keys.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate("subject id", &value)?;
        Ok(Self(value))
    }

    /// Returns the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SubjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_id_roundtrip() {
        let id = ConnectionId::new("sock-9M2f").unwrap();
        let parsed: ConnectionId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.to_string(), "sock-9M2f");
    }

    #[test]
    fn empty_id_is_rejected() {
        assert!(ConnectionId::new("").is_err());
        assert!(SessionId::new("").is_err());
        assert!(SubjectId::new("").is_err());
    }

    #[test]
    fn separator_and_whitespace_are_rejected() {
        assert!(SessionId::new("a/b").is_err());
        assert!(SessionId::new("a b").is_err());
        assert!(ConnectionId::new("sock\t1").is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = SubjectId::new("usr-7").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"usr-7\"");
    }
}
