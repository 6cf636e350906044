//! Cooperative lease lock over the shared key-value store.
//!
//! This lock is a throttle, not a mutual-exclusion guarantee. Acquisition is
//! a plain read followed by a plain write, so two hosts racing within one
//! store round-trip can both believe they hold the lock. The debounced
//! broadcast protocol built on top tolerates that: the worst case is a
//! duplicate broadcast, which costs less than conditional writes on every
//! trigger.
//!
//! Staleness is judged by record age against the caller's `max_age`, so a
//! crashed holder blocks the lock only until the age runs out. Ownership is
//! per host: every service instance on one host shares the same identity,
//! and that identity is injected, never read ambiently from the process
//! environment.
//!
//! # Example
//!
//! ```rust,ignore
//! let lock = LockService::new(kv.clone(), "host-a");
//!
//! if lock.acquire("site-visitors", Duration::from_secs(10)).await? {
//!     // debounce, re-check, release, broadcast
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::keys::LockKey;
use crate::kv::{self, KvStore};

/// Lock record contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockRecord {
    /// When the lock was acquired, as epoch milliseconds.
    #[serde(rename = "acquiredAtEpochMs", with = "chrono::serde::ts_milliseconds")]
    pub acquired_at: DateTime<Utc>,

    /// Host that acquired the lock.
    pub owner_hostname: String,
}

impl LockRecord {
    /// Creates a record acquired now by the given host.
    #[must_use]
    pub fn acquired_now(owner_hostname: impl Into<String>) -> Self {
        Self {
            acquired_at: Utc::now(),
            owner_hostname: owner_hostname.into(),
        }
    }

    /// Returns the record's age relative to `now`.
    ///
    /// A record acquired in the future (clock skew) reads as age zero.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.acquired_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Returns whether the record is at least `max_age` old relative to `now`.
    #[must_use]
    pub fn is_stale(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) >= max_age
    }
}

/// Cooperative lease lock service.
///
/// All instances across the cluster coordinate through the same store keys.
/// The host identity is a constructor argument so tests can line up several
/// "hosts" against one store.
#[derive(Clone)]
pub struct LockService {
    kv: Arc<dyn KvStore>,
    hostname: String,
}

impl LockService {
    /// Creates a lock service with an explicit host identity.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>, hostname: impl Into<String>) -> Self {
        Self {
            kv,
            hostname: hostname.into(),
        }
    }

    /// Returns the host identity this service acquires locks as.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Attempts to acquire the named lock.
    ///
    /// Returns `false` when an existing record is younger than `max_age`,
    /// whoever owns it. Otherwise writes a fresh record for this host and
    /// returns `true`; a stale record is overwritten rather than deleted
    /// first.
    ///
    /// The read and the write are separate store calls, so two racing
    /// acquirers can both return `true`. Callers own that trade-off.
    ///
    /// # Errors
    ///
    /// Store failures propagate; acquisition is never silently assumed.
    pub async fn acquire(&self, name: &str, max_age: Duration) -> Result<bool> {
        if let Some(existing) = self.read_record(name).await? {
            if !existing.is_stale(max_age, Utc::now()) {
                tracing::debug!(
                    lock = name,
                    owner = %existing.owner_hostname,
                    "lock held, acquire refused"
                );
                return Ok(false);
            }
        }

        let record = LockRecord::acquired_now(&self.hostname);
        kv::put_json(self.kv.as_ref(), LockKey::name(name), &record).await?;
        tracing::debug!(lock = name, owner = %self.hostname, "lock acquired");
        Ok(true)
    }

    /// Releases the named lock.
    ///
    /// Returns `true` when the lock was absent or deleted, `false` when the
    /// record belongs to another host (their record is left untouched).
    ///
    /// # Errors
    ///
    /// Store failures propagate.
    pub async fn release(&self, name: &str) -> Result<bool> {
        match self.read_record(name).await? {
            None => Ok(true),
            Some(record) if record.owner_hostname != self.hostname => {
                tracing::debug!(
                    lock = name,
                    owner = %record.owner_hostname,
                    "lock owned elsewhere, release refused"
                );
                Ok(false)
            }
            Some(_) => {
                self.kv.delete(LockKey::name(name).as_ref()).await?;
                tracing::debug!(lock = name, owner = %self.hostname, "lock released");
                Ok(true)
            }
        }
    }

    /// Returns whether this host currently owns the named lock.
    ///
    /// Ownership only: the record's age is not consulted, so a record past
    /// `max_age` still reads as owned until someone overwrites it.
    ///
    /// # Errors
    ///
    /// Store failures propagate.
    pub async fn has_lock(&self, name: &str) -> Result<bool> {
        Ok(self
            .read_record(name)
            .await?
            .is_some_and(|record| record.owner_hostname == self.hostname))
    }

    /// Reads the named lock record. An unreadable record must not wedge the
    /// lock, so it reads as free.
    async fn read_record(&self, name: &str) -> Result<Option<LockRecord>> {
        match kv::get_json::<LockRecord>(self.kv.as_ref(), LockKey::name(name)).await {
            Ok(record) => Ok(record),
            Err(Error::Serialization { message }) => {
                tracing::warn!(lock = name, %message, "unreadable lock record treated as free");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
