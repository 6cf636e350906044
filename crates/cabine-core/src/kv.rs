//! Key-value store abstraction for coordination state.
//!
//! All coordination state (auth packets, booth records, locks) lives in a
//! shared key-value store with TTL support. In production the store is
//! external to the process, so every replica behind the load balancer sees
//! the same contents; this module defines the contract plus an in-memory
//! implementation for tests and local development.
//!
//! The trait works on raw bytes and stays object-safe so services can share
//! one `Arc<dyn KvStore>`; the JSON codec lives in the free functions
//! [`get_json`] and [`put_json`].

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Key-value store trait for coordination state.
///
/// The contract is the minimal subset of a Redis-style store the
/// coordination layer needs: last write wins, no transactions, best-effort
/// TTL.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Reads the value at `key`.
    ///
    /// Returns `None` when the key is absent or its TTL has passed.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Writes `value` at `key`.
    ///
    /// Replaces any existing value and clears any previously set expiry.
    async fn put(&self, key: &str, value: Bytes) -> Result<()>;

    /// Deletes the value at `key`.
    ///
    /// Succeeds even if the key is absent (idempotent).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Sets a time-to-live on an existing key.
    ///
    /// A no-op when the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;
}

/// Reads and decodes a JSON record.
///
/// # Errors
///
/// Returns [`Error::Serialization`] when the stored bytes are not valid JSON
/// for `T`; store failures propagate unchanged.
pub async fn get_json<T>(kv: &dyn KvStore, key: impl AsRef<str>) -> Result<Option<T>>
where
    T: serde::de::DeserializeOwned,
{
    let key = key.as_ref();
    match kv.get(key).await? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(|e| Error::Serialization {
                message: format!("decode record at '{key}': {e}"),
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Encodes and writes a JSON record.
///
/// # Errors
///
/// Returns [`Error::Serialization`] when the value cannot be encoded; store
/// failures propagate unchanged.
pub async fn put_json<T>(kv: &dyn KvStore, key: impl AsRef<str>, value: &T) -> Result<()>
where
    T: serde::Serialize,
{
    let key = key.as_ref();
    let bytes = serde_json::to_vec(value).map_err(|e| Error::Serialization {
        message: format!("encode record at '{key}': {e}"),
    })?;
    kv.put(key, Bytes::from(bytes)).await
}

/// In-memory key-value store for testing and local development.
///
/// Thread-safe via `RwLock`. Not suitable for production: contents are
/// per-process, so replicas would not see each other's state. Expiry is
/// lazy; a key past its deadline is dropped on first access.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Arc<RwLock<HashMap<String, StoredValue>>>,
}

#[derive(Debug, Clone)]
struct StoredValue {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

impl MemoryKvStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut entries = self.entries.write().map_err(|_| Error::Internal {
            message: "kv lock poisoned".into(),
        })?;

        if entries.get(key).is_some_and(StoredValue::is_expired) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|stored| stored.value.clone()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| Error::Internal {
                message: "kv lock poisoned".into(),
            })?
            .insert(
                key.to_string(),
                StoredValue {
                    value,
                    expires_at: None,
                },
            );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries
            .write()
            .map_err(|_| Error::Internal {
                message: "kv lock poisoned".into(),
            })?
            .remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| Error::Internal {
            message: "kv lock poisoned".into(),
        })?;

        if let Some(stored) = entries.get_mut(key) {
            stored.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}
