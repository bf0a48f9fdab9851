//! Pool configuration: defaults, normalization, validation, TOML loading.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PoolError;

/// Default values for unset configuration fields.
mod defaults {
    use std::time::Duration;

    pub fn min_connections() -> usize {
        16
    }

    pub fn max_connections() -> usize {
        256
    }

    pub fn idle_timeout() -> Duration {
        Duration::from_secs(10)
    }
}

/// Serde helper for durations expressed in whole seconds.
///
/// TOML configs specify timeouts in seconds; programmatic construction can
/// use any [`Duration`].
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Configuration for a [`Pool`](crate::Pool).
///
/// `min_connections` is both the pre-warmed baseline and the idle queue's
/// capacity; `max_connections` is the hard ceiling on live connections;
/// `idle_timeout` bounds how long a released connection waits to be
/// re-queued before it is closed instead. Zero values mean "unset" and
/// fall back to the defaults, matching the behavior callers get from the
/// serde defaults when a field is omitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    /// Backend endpoint handed to the connection factory.
    pub address: String,

    /// Pre-warmed baseline connection count (default 16).
    #[serde(default = "defaults::min_connections")]
    pub min_connections: usize,

    /// Hard ceiling on total live connections (default 256).
    #[serde(default = "defaults::max_connections")]
    pub max_connections: usize,

    /// Idle re-queue deadline in seconds (default 10).
    #[serde(with = "duration_serde", default = "defaults::idle_timeout")]
    pub idle_timeout: Duration,
}

impl PoolConfig {
    /// Create a configuration for `address` with default pool sizing.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            min_connections: defaults::min_connections(),
            max_connections: defaults::max_connections(),
            idle_timeout: defaults::idle_timeout(),
        }
    }

    /// Set the pre-warmed baseline connection count.
    #[must_use]
    pub fn min_connections(mut self, n: usize) -> Self {
        self.min_connections = n;
        self
    }

    /// Set the ceiling on total live connections.
    #[must_use]
    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    /// Set the idle re-queue deadline.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Load a configuration from a TOML file.
    ///
    /// Defaults are applied for omitted fields; the result is not yet
    /// validated, since [`Pool::new`](crate::Pool::new) validates on
    /// construction.
    pub fn from_toml_file(path: &str) -> Result<Self, PoolError> {
        let contents = std::fs::read_to_string(path).map_err(|e| PoolError::Config {
            path: path.to_string(),
            reason: format!("failed to read file: {e}"),
        })?;

        toml::from_str(&contents).map_err(|e| PoolError::Config {
            path: path.to_string(),
            reason: format!("failed to parse TOML: {e}"),
        })
    }

    /// Replace zero-valued fields with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.min_connections == 0 {
            self.min_connections = defaults::min_connections();
        }
        if self.max_connections == 0 {
            self.max_connections = defaults::max_connections();
        }
        if self.idle_timeout.is_zero() {
            self.idle_timeout = defaults::idle_timeout();
        }
        self
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.address.is_empty() {
            return Err(PoolError::EmptyAddress);
        }
        if self.max_connections < self.min_connections {
            return Err(PoolError::InvalidBounds {
                min: self.min_connections,
                max: self.max_connections,
            });
        }
        Ok(())
    }
}
