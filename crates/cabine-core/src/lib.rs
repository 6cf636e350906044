//! # cabine-core
//!
//! Core abstractions for the cabine live-interpretation coordination layer.
//!
//! This crate provides the foundational types and traits used across all cabine components:
//!
//! - **Identifiers**: Strongly-typed ids for connections, sessions, and attendees
//! - **Booths**: The (session, channel) pair every coordination operation is scoped to
//! - **Store Traits**: The shared key-value store all coordination state lives in
//! - **Transport Traits**: The room-scoped broadcast fabric events fan out through
//! - **Lock Service**: Cooperative lease lock for cluster-wide debouncing
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `cabine-core` is the **only** crate allowed to define shared primitives.
//! Coordination state lives exclusively in the key-value store; nothing in
//! this crate holds cross-connection state in process memory, so any number
//! of replicas can serve the same conference.
//!
//! ## Example
//!
//! ```rust
//! use cabine_core::prelude::*;
//!
//! let session = SessionId::new("sess-42").unwrap();
//! let booth = BoothId::new(session, Channel::En);
//!
//! assert_eq!(booth.interpret_room().as_ref(), "interpret/sess-42/en");
//! assert_eq!(booth.channel_room().as_ref(), "channel/sess-42/en");
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod booth;
pub mod error;
pub mod id;
pub mod keys;
pub mod kv;
pub mod lock;
pub mod observability;
pub mod transport;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use cabine_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::booth::{BoothId, Channel};
    pub use crate::error::{Error, Result};
    pub use crate::id::{ConnectionId, SessionId, SubjectId};
    pub use crate::keys::{
        ActiveBoothKey, ActiveInterpreterKey, ArchiveKey, AuthKey, KvKey, LockKey,
    };
    pub use crate::kv::{KvStore, MemoryKvStore};
    pub use crate::lock::{LockRecord, LockService};
    pub use crate::transport::{
        EmitTarget, EmittedEvent, ErrorNotice, EventPayload, MemoryRoomTransport, RoomName,
        RoomTransport,
    };
}

// Re-export key types at crate root for ergonomics
pub use booth::{BoothId, Channel};
pub use error::{Error, Result};
pub use id::{ConnectionId, SessionId, SubjectId};
pub use keys::{ActiveBoothKey, ActiveInterpreterKey, ArchiveKey, AuthKey, KvKey, LockKey};
pub use kv::{KvStore, MemoryKvStore};
pub use lock::{LockRecord, LockService};
pub use observability::{LogFormat, init_logging};
pub use transport::{
    EmitTarget, EmittedEvent, ErrorNotice, EventPayload, MemoryRoomTransport, RoomName,
    RoomTransport,
};
