//! Bounded, self-healing connection pool for a single backend service.
//!
//! The pool pre-warms a baseline of `min_connections`, recycles them
//! through a bounded idle queue, grows on demand up to `max_connections`,
//! and shrinks back toward the baseline as load subsides: a released
//! connection either parks in the idle queue, or is torn down when the
//! queue stays full past the idle timeout or the pool shuts down.
//!
//! The underlying connection is opaque. Supply a [`ConnectionFactory`]
//! that knows how to create and close it; [`TcpConnector`] covers plain
//! TCP backends out of the box.
//!
//! ```no_run
//! use conn_pool::{Pool, PoolConfig, TcpConnector};
//! use std::time::Duration;
//! use tokio::io::AsyncWriteExt;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PoolConfig::new("backend.example.com:9090")
//!     .min_connections(4)
//!     .max_connections(32)
//!     .idle_timeout(Duration::from_secs(10));
//!
//! let pool = Pool::new(config, TcpConnector::new()).await?;
//!
//! let mut conn = pool.acquire().await?;
//! conn.write_all(b"ping").await?;
//! conn.release().await?;
//!
//! pool.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! When capacity is exhausted, [`Pool::acquire`] blocks until another
//! caller releases a connection, with no internal timeout; wrap the call
//! in `tokio::time::timeout` if you need a deadline.

pub mod config;
pub mod conn;
pub mod error;
pub mod factory;
pub mod pool;
pub mod tcp;
pub mod types;

pub use config::PoolConfig;
pub use conn::PooledConn;
pub use error::PoolError;
pub use factory::ConnectionFactory;
pub use pool::{Pool, PoolStatus};
pub use tcp::TcpConnector;
