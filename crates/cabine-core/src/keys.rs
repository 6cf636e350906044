//! Typed keys for the shared key-value namespace.
//!
//! Every record family lives under its own prefix, and each prefix gets a key
//! type so call sites cannot assemble a path by hand. Wrong keys fail to
//! compile instead of colliding at runtime.
//!
//! # Key Types
//!
//! | Key Type | Prefix | Written by | Cleared by |
//! |----------|--------|------------|------------|
//! | `AuthKey` | `auth/` | socket-auth binding | logout, TTL expiry |
//! | `ActiveBoothKey` | `active-booth/` | booth start | stop, leave, disconnect |
//! | `ActiveInterpreterKey` | `active-interpreter/` | booth start | stop, leave, disconnect |
//! | `LockKey` | `lock/` | lock service | lock release |
//!
//! [`ArchiveKey`] addresses the archive object store rather than the
//! key-value store; it lives here so every derived path sits in one module.
//!
//! # Example
//!
//! ```rust
//! use cabine_core::id::ConnectionId;
//! use cabine_core::keys::AuthKey;
//!
//! let conn = ConnectionId::new("sock-1").unwrap();
//! let key = AuthKey::connection(&conn);
//! assert_eq!(key.as_ref(), "auth/sock-1");
//! ```

use chrono::{DateTime, Utc};

use crate::booth::BoothId;
use crate::id::ConnectionId;

/// A typed key that encodes path structure.
///
/// All key types implement this trait to provide uniform access to the
/// underlying key string.
pub trait KvKey: AsRef<str> {
    /// Returns the underlying key string.
    fn path(&self) -> &str {
        self.as_ref()
    }
}

// ============================================================================
// AuthKey - socket-auth packets
// ============================================================================

/// A typed key for socket-auth packets.
///
/// # Path Format
///
/// `auth/{connectionId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthKey(String);

impl AuthKey {
    /// Creates the auth-packet key for a connection.
    #[must_use]
    pub fn connection(connection: &ConnectionId) -> Self {
        Self(format!("auth/{connection}"))
    }
}

impl AsRef<str> for AuthKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl KvKey for AuthKey {}

impl std::fmt::Display for AuthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ActiveBoothKey - who is live in a booth
// ============================================================================

/// A typed key for the active record of a booth.
///
/// Present exactly when the booth is Occupied.
///
/// # Path Format
///
/// `active-booth/{sessionId}/{channel}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveBoothKey(String);

impl ActiveBoothKey {
    /// Creates the active-record key for a booth.
    #[must_use]
    pub fn booth(booth: &BoothId) -> Self {
        Self(format!("active-booth/{}/{}", booth.session, booth.channel))
    }
}

impl AsRef<str> for ActiveBoothKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl KvKey for ActiveBoothKey {}

impl std::fmt::Display for ActiveBoothKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ActiveInterpreterKey - reverse index from connection to booth
// ============================================================================

/// A typed key for the reverse record of an active interpreter.
///
/// Lets audio relay and disconnect cleanup find the booth from a connection
/// id alone.
///
/// # Path Format
///
/// `active-interpreter/{connectionId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActiveInterpreterKey(String);

impl ActiveInterpreterKey {
    /// Creates the reverse-record key for a connection.
    #[must_use]
    pub fn connection(connection: &ConnectionId) -> Self {
        Self(format!("active-interpreter/{connection}"))
    }
}

impl AsRef<str> for ActiveInterpreterKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl KvKey for ActiveInterpreterKey {}

impl std::fmt::Display for ActiveInterpreterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// LockKey - cooperative lease locks
// ============================================================================

/// A typed key for lock records.
///
/// Callers choose the logical lock name; the prefix keeps lock records from
/// colliding with other families in the shared store.
///
/// # Path Format
///
/// `lock/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey(String);

impl LockKey {
    /// Creates the key for a named lock.
    #[must_use]
    pub fn name(name: &str) -> Self {
        Self(format!("lock/{name}"))
    }
}

impl AsRef<str> for LockKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl KvKey for LockKey {}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ArchiveKey - interpretation audio chunks (object store)
// ============================================================================

/// A typed key for archived audio chunks.
///
/// # Path Format
///
/// `interpretation/{sessionId}/{channel}/{epochMs}.chunk`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveKey(String);

impl ArchiveKey {
    /// Creates the archive key for a chunk relayed at `at`.
    #[must_use]
    pub fn chunk(booth: &BoothId, at: DateTime<Utc>) -> Self {
        Self(format!(
            "interpretation/{}/{}/{}.chunk",
            booth.session,
            booth.channel,
            at.timestamp_millis()
        ))
    }
}

impl AsRef<str> for ArchiveKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl KvKey for ArchiveKey {}

impl std::fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booth::Channel;
    use crate::id::SessionId;

    fn booth() -> BoothId {
        BoothId::new(SessionId::new("sess-42").unwrap(), Channel::Fr)
    }

    #[test]
    fn test_auth_key_format() {
        let conn = ConnectionId::new("sock-1").unwrap();
        assert_eq!(AuthKey::connection(&conn).as_ref(), "auth/sock-1");
    }

    #[test]
    fn test_active_booth_key_format() {
        assert_eq!(
            ActiveBoothKey::booth(&booth()).as_ref(),
            "active-booth/sess-42/fr"
        );
    }

    #[test]
    fn test_active_interpreter_key_format() {
        let conn = ConnectionId::new("sock-1").unwrap();
        assert_eq!(
            ActiveInterpreterKey::connection(&conn).as_ref(),
            "active-interpreter/sock-1"
        );
    }

    #[test]
    fn test_lock_key_format() {
        assert_eq!(LockKey::name("site-visitors").as_ref(), "lock/site-visitors");
    }

    #[test]
    fn test_archive_key_format() {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        assert_eq!(
            ArchiveKey::chunk(&booth(), at).as_ref(),
            "interpretation/sess-42/fr/1700000000000.chunk"
        );
    }

    #[test]
    fn test_keys_implement_display() {
        let key = LockKey::name("x");
        assert_eq!(format!("{key}"), "lock/x");
    }
}
