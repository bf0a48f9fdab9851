//! The connection factory seam.
//!
//! The pool never inspects the connections it manages; it only asks the
//! factory to create them and, eventually, to close them. Everything the
//! connection does in between is the caller's business.

use anyhow::Result;
use async_trait::async_trait;

/// External collaborator that constructs and destroys raw connections.
///
/// `create` may block on network I/O; the pool calls it while holding a
/// reserved capacity slot but no locks. Errors are passed through to the
/// caller unchanged and never retried.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The raw connection handle. Opaque to the pool.
    type Connection: Send + 'static;

    /// Establish a new connection to the backend at `addr`.
    async fn create(&self, addr: &str) -> Result<Self::Connection>;

    /// Tear down a connection.
    async fn close(&self, conn: Self::Connection) -> Result<()>;
}
