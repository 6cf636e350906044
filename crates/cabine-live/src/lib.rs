//! # cabine-live
//!
//! Live coordination services for the cabine interpretation platform.
//!
//! This crate implements the conference-facing domain, providing:
//!
//! - **Socket auth binding**: Verified identity pinned to a connection id
//! - **Channel membership**: Listener fan-out rooms per session and language
//! - **Booth coordination**: The hand-off state machine for interpreter booths
//! - **Audio relay**: Low-latency chunk fan-out with best-effort archival
//! - **Site presence**: Debounced aggregate visitor counts
//!
//! ## Architecture
//!
//! Every service runs over the two shared fabrics from `cabine-core`: the
//! key-value store is the system of record and the room transport is the
//! fan-out path. No cross-connection state lives in process memory, so any
//! number of replicas can serve the same conference; the only cross-replica
//! coordination is the cooperative lock that debounces aggregate broadcasts.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cabine_live::{Collaborators, Coordinator, LiveConfig};
//!
//! let config = LiveConfig::from_env()?;
//! let coordinator = Coordinator::new(config, collaborators);
//!
//! // The socket layer maps frames onto the coordinator.
//! coordinator.connection_opened(&conn).await;
//! coordinator.handle_event(&conn, event).await;
//! coordinator.handle_audio(&conn, frame).await;
//! coordinator.connection_closed(&conn).await;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod audio;
pub mod auth;
pub mod booth;
pub mod broadcast;
pub mod channel;
pub mod config;
pub mod coordinator;
pub mod directory;
pub mod metrics;
pub mod policy;
pub mod presence;
pub mod protocol;

// Re-export main types at crate root
pub use audio::AudioRelay;
pub use auth::{AuthBinding, SocketAuthPacket};
pub use booth::{ActiveBoothRecord, ActiveInterpreterRecord, BoothService};
pub use broadcast::BroadcastSpec;
pub use channel::ChannelService;
pub use config::LiveConfig;
pub use coordinator::{Collaborators, Coordinator};
pub use directory::{
    ArchiveStore, EventSink, IdentityVerifier, InterpreterDirectory, InterpreterRecord,
    SessionDirectory, SessionInfo, TrackContext, UserClaims,
};
pub use presence::PresenceService;
pub use protocol::ClientEvent;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::audio::AudioRelay;
    pub use crate::auth::{AuthBinding, SocketAuthPacket};
    pub use crate::booth::BoothService;
    pub use crate::channel::ChannelService;
    pub use crate::config::LiveConfig;
    pub use crate::coordinator::{Collaborators, Coordinator};
    pub use crate::directory::{
        ArchiveStore, EventSink, IdentityVerifier, InterpreterDirectory, SessionDirectory,
    };
    pub use crate::presence::PresenceService;
    pub use crate::protocol::ClientEvent;
}
