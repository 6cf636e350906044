//! Test key-value store with operation tracing.
//!
//! Provides an in-memory store that records all operations for test
//! assertions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use cabine_core::{Error, KvStore, Result};

/// Record of a store operation for test assertions.
#[derive(Debug, Clone)]
pub enum KvOp {
    /// Get operation.
    Get {
        /// Key that was read.
        key: String,
    },
    /// Put operation.
    Put {
        /// Key that was written.
        key: String,
        /// Size of the value written.
        size: usize,
    },
    /// Delete operation.
    Delete {
        /// Key that was deleted.
        key: String,
    },
    /// Expire operation.
    Expire {
        /// Key whose lifetime was bounded.
        key: String,
        /// Requested time to live.
        ttl: Duration,
    },
}

/// In-memory key-value store with operation tracing.
///
/// Records all operations for later assertion in tests. Time-to-live
/// behaviour matches [`cabine_core::MemoryKvStore`]: expired keys read as
/// absent.
#[derive(Debug, Clone, Default)]
pub struct TracingKvStore {
    entries: Arc<Mutex<HashMap<String, StoredValue>>>,
    operations: Arc<Mutex<Vec<KvOp>>>,
    fail_keys: Arc<Mutex<Vec<String>>>,
    latency: Option<Duration>,
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

impl TracingKvStore {
    /// Creates a new empty tracing store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with simulated latency.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<KvOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Injects a failure for the given key prefix.
    pub fn inject_failure(&self, key: impl Into<String>) {
        self.fail_keys.lock().expect("lock").push(key.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_keys.lock().expect("lock").clear();
    }

    /// Returns all stored keys (for debugging).
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().expect("lock").keys().cloned().collect()
    }

    fn record(&self, op: KvOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure(&self, key: &str) -> Result<()> {
        let fail_keys = self.fail_keys.lock().expect("lock");
        if fail_keys.iter().any(|p| key.starts_with(p)) {
            return Err(Error::Internal {
                message: format!("injected failure for key: {key}"),
            });
        }
        Ok(())
    }

    async fn maybe_delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait::async_trait]
impl KvStore for TracingKvStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.maybe_delay().await;
        self.check_failure(key)?;
        self.record(KvOp::Get {
            key: key.to_string(),
        });

        let mut entries = self.entries.lock().expect("lock");
        if entries.get(key).is_some_and(StoredValue::is_expired) {
            entries.remove(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|stored| stored.value.clone()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(key)?;
        self.record(KvOp::Put {
            key: key.to_string(),
            size: value.len(),
        });

        self.entries.lock().expect("lock").insert(
            key.to_string(),
            StoredValue {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(key)?;
        self.record(KvOp::Delete {
            key: key.to_string(),
        });

        self.entries.lock().expect("lock").remove(key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure(key)?;
        self.record(KvOp::Expire {
            key: key.to_string(),
            ttl,
        });

        if let Some(stored) = self.entries.lock().expect("lock").get_mut(key) {
            stored.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }
}
