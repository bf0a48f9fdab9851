//! The leased connection handle and its timed release race.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::PoolError;
use crate::factory::ConnectionFactory;
use crate::pool::PoolShared;

/// A connection checked out of a [`Pool`](crate::Pool).
///
/// Exclusively owned by the holder; the raw connection is reachable
/// through `Deref`/`DerefMut`. Call [`release`](Self::release) to hand it
/// back to the pool. Dropping it without releasing closes the raw
/// connection on a background task instead of recycling it, so a lost
/// handle never leaks a capacity slot, but the release path is the one
/// that keeps connections in circulation.
pub struct PooledConn<F: ConnectionFactory> {
    conn: Option<F::Connection>,
    shared: Arc<PoolShared<F>>,
    idle_timeout: Duration,
}

impl<F: ConnectionFactory> PooledConn<F> {
    pub(crate) fn new(
        conn: F::Connection,
        shared: Arc<PoolShared<F>>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            conn: Some(conn),
            shared,
            idle_timeout,
        }
    }

    /// Return the connection to the pool, or tear it down.
    ///
    /// A single three-way race decides the connection's fate:
    ///
    /// - the idle queue accepts it before anything else: the connection
    ///   parks idle and its capacity slot stays reserved;
    /// - the pool's shutdown signal fires first: the connection is closed
    ///   and the close error, if any, is returned;
    /// - the idle timeout elapses first (the queue was full the whole
    ///   time): the connection is closed; a close error here is logged
    ///   and swallowed, since the eviction is housekeeping rather than
    ///   something the releasing caller asked for.
    ///
    /// The race runs on a reserved queue permit, so a connection that
    /// loses the re-queue branch is never silently dropped mid-send.
    pub async fn release(mut self) -> Result<(), PoolError> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        let idle_timeout = self.idle_timeout;
        let shared = Arc::clone(&self.shared);
        drop(self);

        let mut shutdown_rx = shared.subscribe_shutdown();
        if shared.is_closed() {
            return shared.close_now(conn).await;
        }

        tokio::select! {
            permit = shared.idle_tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(conn);
                    debug!("connection parked idle");
                    // Shutdown may have drained the queue before this send
                    // landed; sweep again so nothing stays parked.
                    if shared.is_closed() {
                        shared.drain_idle().await;
                    }
                    Ok(())
                }
                // Receiver side is gone; nothing left to park into.
                Err(_) => shared.close_now(conn).await,
            },
            _ = tokio::time::sleep(idle_timeout) => {
                debug!("idle timeout elapsed before re-queue, closing connection");
                if let Err(e) = shared.close_now(conn).await {
                    warn!(error = %e, "failed to close connection evicted on idle timeout");
                }
                Ok(())
            }
            _ = shutdown_rx.recv() => {
                debug!("shutdown observed during release, closing connection");
                shared.close_now(conn).await
            }
        }
    }

    /// Permanently remove the connection from the pool and take ownership
    /// of the raw handle.
    ///
    /// The capacity slot is freed immediately; closing the returned
    /// connection becomes the caller's responsibility.
    pub fn detach(mut self) -> F::Connection {
        let conn = self.conn.take().expect("connection already released");
        self.shared.release_slot();
        conn
    }
}

impl<F: ConnectionFactory> Deref for PooledConn<F> {
    type Target = F::Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection accessed after release")
    }
}

impl<F: ConnectionFactory> DerefMut for PooledConn<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection accessed after release")
    }
}

impl<F: ConnectionFactory> Drop for PooledConn<F> {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        self.shared.release_slot();
        let shared = Arc::clone(&self.shared);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = shared.factory.close(conn).await {
                        debug!(error = %e, "failed to close dropped connection");
                    }
                });
            }
            // No runtime to close on; the raw connection is simply dropped.
            Err(_) => warn!("pooled connection dropped outside a runtime, skipping factory close"),
        }
    }
}
