//! Error types for pool construction, acquisition, and teardown.

use thiserror::Error;

/// Errors surfaced by the connection pool.
///
/// Configuration problems are reported synchronously from [`Pool::new`];
/// factory failures pass through unchanged and are never retried by the
/// pool; [`PoolError::Closed`] is the sentinel returned from any
/// acquisition attempt once shutdown has begun.
///
/// [`Pool::new`]: crate::Pool::new
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The pool has been shut down.
    #[error("pool closed")]
    Closed,

    /// The configured backend address is empty.
    #[error("address can not be empty")]
    EmptyAddress,

    /// `max_connections` is smaller than `min_connections`.
    #[error("invalid connection bounds: max ({max}) is less than min ({min})")]
    InvalidBounds { min: usize, max: usize },

    /// Reading or parsing a TOML config file failed.
    #[error("failed to load pool config from '{path}': {reason}")]
    Config { path: String, reason: String },

    /// Error from the connection factory (create or close).
    #[error("{0}")]
    Factory(anyhow::Error),
}

impl PoolError {
    /// Check whether this is the post-shutdown sentinel.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Check whether this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyAddress | Self::InvalidBounds { .. } | Self::Config { .. }
        )
    }
}

impl From<anyhow::Error> for PoolError {
    fn from(err: anyhow::Error) -> Self {
        Self::Factory(err)
    }
}
