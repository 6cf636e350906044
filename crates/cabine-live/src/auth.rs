//! Socket-auth binding: pins a verified identity to a connection id.
//!
//! A connection authenticates once; the resulting [`SocketAuthPacket`] is
//! written to the shared store under `auth/{connectionId}` with a TTL, and
//! every later operation resolves it from there. Any replica can serve any
//! frame, because the binding lives in the store rather than in the process
//! that happened to see the `authenticate` event.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use cabine_core::keys::AuthKey;
use cabine_core::kv::{get_json, put_json};
use cabine_core::{ConnectionId, Error, KvStore, Result};

use crate::directory::{IdentityVerifier, InterpreterDirectory, InterpreterRecord, UserClaims};

/// Identity bound to one socket connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketAuthPacket {
    /// Verified token claims.
    pub claims: UserClaims,
    /// Registered account email for the subject.
    pub email: String,
    /// Interpreter directory entry, when the email belongs to one.
    #[serde(default)]
    pub interpreter: Option<InterpreterRecord>,
}

/// Binds verified identities to live socket connections.
#[derive(Clone)]
pub struct AuthBinding {
    kv: Arc<dyn KvStore>,
    identity: Arc<dyn IdentityVerifier>,
    interpreters: Arc<dyn InterpreterDirectory>,
    ttl: Duration,
}

impl AuthBinding {
    /// Creates a binding over the shared store and platform directories.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KvStore>,
        identity: Arc<dyn IdentityVerifier>,
        interpreters: Arc<dyn InterpreterDirectory>,
        ttl: Duration,
    ) -> Self {
        Self {
            kv,
            identity,
            interpreters,
            ttl,
        }
    }

    /// Verifies `token` and pins the resulting identity to `conn`.
    ///
    /// The packet expires on its own after the configured TTL, so an
    /// abandoned binding never needs explicit cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the token fails verification or
    /// the subject has no registered email.
    pub async fn bind(&self, conn: &ConnectionId, token: &str) -> Result<SocketAuthPacket> {
        let claims = self.identity.verify_token(token).await?;
        let email = self
            .identity
            .registered_email(&claims.subject)
            .await?
            .ok_or_else(|| {
                Error::unauthorized(format!(
                    "subject '{}' has no registered email",
                    claims.subject
                ))
            })?;
        let interpreter = self.interpreters.find_by_email(&email).await?;

        let packet = SocketAuthPacket {
            claims,
            email,
            interpreter,
        };
        let key = AuthKey::connection(conn);
        put_json(self.kv.as_ref(), &key, &packet).await?;
        self.kv.expire(key.as_ref(), self.ttl).await?;
        debug!(
            connection = %conn,
            subject = %packet.claims.subject,
            interpreter = packet.interpreter.is_some(),
            "bound socket identity"
        );
        Ok(packet)
    }

    /// Drops the identity bound to `conn`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the connection holds no binding.
    pub async fn unbind(&self, conn: &ConnectionId) -> Result<()> {
        let key = AuthKey::connection(conn);
        if self.kv.get(key.as_ref()).await?.is_none() {
            return Err(Error::unauthorized(format!(
                "connection '{conn}' is not authenticated"
            )));
        }
        self.kv.delete(key.as_ref()).await?;
        debug!(connection = %conn, "unbound socket identity");
        Ok(())
    }

    /// Resolves the identity bound to `conn`.
    ///
    /// This is the single choke point every authenticated operation goes
    /// through.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the connection holds no binding
    /// (never authenticated, logged out, or TTL passed).
    pub async fn resolve(&self, conn: &ConnectionId) -> Result<SocketAuthPacket> {
        get_json(self.kv.as_ref(), AuthKey::connection(conn))
            .await?
            .ok_or_else(|| {
                Error::unauthorized(format!("connection '{conn}' is not authenticated"))
            })
    }

    /// Resolves the identity bound to `conn` and requires it to be a
    /// registered interpreter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] when the connection holds no binding
    /// or the bound account is not in the interpreter directory.
    pub async fn resolve_interpreter(
        &self,
        conn: &ConnectionId,
    ) -> Result<(SocketAuthPacket, InterpreterRecord)> {
        let packet = self.resolve(conn).await?;
        let interpreter = packet.interpreter.clone().ok_or_else(|| {
            Error::unauthorized(format!(
                "connection '{conn}' is not a registered interpreter"
            ))
        })?;
        Ok((packet, interpreter))
    }
}
