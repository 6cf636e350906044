//! Runtime configuration for the live coordination layer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use cabine_core::{Error, Result};

const DEFAULT_AUTH_TTL_SECS: u64 = 86_400; // 24 hours
const DEFAULT_PRESENCE_DEBOUNCE_MS: u64 = 1_000;
const DEFAULT_PRESENCE_LOCK_MAX_AGE_MS: u64 = 10_000;

/// Configuration for the live coordination services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Seconds an auth packet stays readable after binding.
    pub auth_ttl_secs: u64,

    /// Milliseconds the presence broadcast waits before counting, so a
    /// burst of joins and leaves collapses into one emission.
    pub presence_debounce_ms: u64,

    /// Milliseconds after which a presence lock is treated as abandoned
    /// and taken over. Must exceed the debounce window, otherwise a live
    /// in-flight broadcast would look abandoned.
    pub presence_lock_max_age_ms: u64,

    /// Host identity stamped into lock records.
    pub hostname: String,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            auth_ttl_secs: DEFAULT_AUTH_TTL_SECS,
            presence_debounce_ms: DEFAULT_PRESENCE_DEBOUNCE_MS,
            presence_lock_max_age_ms: DEFAULT_PRESENCE_LOCK_MAX_AGE_MS,
            hostname: default_hostname(),
        }
    }
}

impl LiveConfig {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `CABINE_AUTH_TTL_SECS`
    /// - `CABINE_PRESENCE_DEBOUNCE_MS`
    /// - `CABINE_PRESENCE_LOCK_MAX_AGE_MS`
    /// - `CABINE_HOSTNAME` (falls back to `HOSTNAME`, then a generated id)
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed, or if
    /// the resulting values fail [`LiveConfig::validate`].
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(secs) = env_u64("CABINE_AUTH_TTL_SECS")? {
            config.auth_ttl_secs = secs;
        }
        if let Some(ms) = env_u64("CABINE_PRESENCE_DEBOUNCE_MS")? {
            config.presence_debounce_ms = ms;
        }
        if let Some(ms) = env_u64("CABINE_PRESENCE_LOCK_MAX_AGE_MS")? {
            config.presence_lock_max_age_ms = ms;
        }
        if let Some(hostname) = env_string("CABINE_HOSTNAME") {
            config.hostname = hostname;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configured values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] when a value is out of range or the
    /// lock max age does not exceed the debounce window.
    pub fn validate(&self) -> Result<()> {
        if self.auth_ttl_secs == 0 {
            return Err(Error::bad_request(
                "CABINE_AUTH_TTL_SECS must be greater than 0",
            ));
        }
        if self.presence_lock_max_age_ms <= self.presence_debounce_ms {
            return Err(Error::bad_request(
                "CABINE_PRESENCE_LOCK_MAX_AGE_MS must exceed CABINE_PRESENCE_DEBOUNCE_MS",
            ));
        }
        if self.hostname.trim().is_empty() {
            return Err(Error::bad_request("CABINE_HOSTNAME must not be blank"));
        }
        Ok(())
    }

    /// TTL applied to socket auth packets.
    #[must_use]
    pub fn auth_ttl(&self) -> Duration {
        Duration::from_secs(self.auth_ttl_secs)
    }

    /// Debounce window for the presence broadcast.
    #[must_use]
    pub fn presence_debounce(&self) -> Duration {
        Duration::from_millis(self.presence_debounce_ms)
    }

    /// Age past which a presence lock counts as abandoned.
    #[must_use]
    pub fn presence_lock_max_age(&self) -> Duration {
        Duration::from_millis(self.presence_lock_max_age_ms)
    }
}

fn default_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| format!("host-{}", ulid::Ulid::new()))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::bad_request(format!("{name} must be a u64: {e}")))
}
