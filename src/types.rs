//! Pool metric newtypes.
//!
//! Type-safe wrappers for the counts reported by [`Pool::status`], so the
//! different statistics cannot be mixed up at call sites.
//!
//! [`Pool::status`]: crate::Pool::status

use std::fmt;

/// Number of connections currently parked in the idle queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdleConnections(usize);

impl IdleConnections {
    #[inline]
    pub const fn new(count: usize) -> Self {
        Self(count)
    }

    /// Get the raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for IdleConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for IdleConnections {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Hard ceiling on total live connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MaxPoolSize(usize);

impl MaxPoolSize {
    #[inline]
    pub const fn new(size: usize) -> Self {
        Self(size)
    }

    /// Get the raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for MaxPoolSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for MaxPoolSize {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Connections alive beyond the pre-warmed baseline.
///
/// Incremented when the pool grows to meet transient demand, decremented
/// when a connection is torn down on release. While a grown connection
/// sits in the idle queue its slot stays reserved, so the count covers
/// idle and in-use connections alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AboveBaseline(usize);

impl AboveBaseline {
    #[inline]
    pub const fn new(count: usize) -> Self {
        Self(count)
    }

    /// Get the raw value
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl fmt::Display for AboveBaseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for AboveBaseline {
    fn from(value: usize) -> Self {
        Self(value)
    }
}
