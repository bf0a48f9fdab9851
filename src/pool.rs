//! The pool state machine: bounded idle queue, above-baseline growth, and
//! one-shot shutdown.
//!
//! The idle queue is a bounded mpsc channel with capacity equal to the
//! pre-warmed baseline, so the pool can never park more than
//! `min_connections` idle connections; everything created beyond that is
//! torn down once released, which is what makes the pool self-shrinking.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::conn::PooledConn;
use crate::error::PoolError;
use crate::factory::ConnectionFactory;
use crate::types::{AboveBaseline, IdleConnections, MaxPoolSize};

/// Snapshot of the pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Connections parked in the idle queue.
    pub idle: IdleConnections,
    /// Live connections beyond the baseline, idle or in use.
    pub above_baseline: AboveBaseline,
    /// Configured ceiling on live connections.
    pub max_size: MaxPoolSize,
}

/// State shared between the pool and every leased connection.
///
/// Leased connections hold this only as a capability: the idle-queue
/// sender, the shutdown signal, the slot counter, and the factory for
/// closing. Nothing here lets them reach into the pool beyond the release
/// protocol.
pub(crate) struct PoolShared<F: ConnectionFactory> {
    pub(crate) factory: F,
    address: String,
    min_connections: usize,
    max_connections: usize,
    pub(crate) idle_tx: mpsc::Sender<F::Connection>,
    idle_rx: Mutex<mpsc::Receiver<F::Connection>>,
    above_baseline: AtomicUsize,
    closed: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl<F: ConnectionFactory> PoolShared<F> {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Atomically reserve an above-baseline slot.
    ///
    /// The ceiling check and the increment are a single compare-and-swap
    /// decision, so concurrent acquirers can never overshoot
    /// `max_connections` even momentarily.
    fn try_reserve_slot(&self) -> bool {
        self.above_baseline
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (self.min_connections + n < self.max_connections).then_some(n + 1)
            })
            .is_ok()
    }

    /// Give back a slot when a connection is torn down.
    ///
    /// Saturates at zero: closing a baseline connection (idle timeout on a
    /// quiet pool) must not underflow the counter. The baseline refills on
    /// demand through the growth path.
    pub(crate) fn release_slot(&self) {
        let _ = self
            .above_baseline
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Tear down a connection and free its capacity slot.
    pub(crate) async fn close_now(&self, conn: F::Connection) -> Result<(), PoolError> {
        self.release_slot();
        self.factory.close(conn).await.map_err(PoolError::Factory)
    }

    /// Empty the idle queue, closing every parked connection.
    ///
    /// Close errors are logged and swallowed: background reclamation has
    /// no caller to report to.
    pub(crate) async fn drain_idle(&self) {
        let mut rx = self.idle_rx.lock().await;
        while let Ok(conn) = rx.try_recv() {
            if let Err(e) = self.factory.close(conn).await {
                warn!(error = %e, "failed to close idle connection during drain");
            }
        }
    }
}

/// A bounded, self-healing pool of reusable connections to one backend.
///
/// `min_connections` are established up front and recycled through the
/// idle queue; demand beyond that grows the pool up to `max_connections`,
/// and the extra connections are closed again once released. See
/// [`Pool::acquire`] for the exact acquisition order and
/// [`PooledConn::release`] for the timed race that decides a returned
/// connection's fate.
pub struct Pool<F: ConnectionFactory> {
    shared: Arc<PoolShared<F>>,
    config: PoolConfig,
}

impl<F: ConnectionFactory> Pool<F> {
    /// Create a pool and synchronously pre-warm the baseline connections.
    ///
    /// Zero-valued config fields fall back to their defaults before
    /// validation. If any of the `min_connections` initial creations
    /// fails, the partially built pool is shut down (closing whatever was
    /// created) and the factory's error is returned; no partial pool is
    /// ever exposed.
    pub async fn new(config: PoolConfig, factory: F) -> Result<Self, PoolError> {
        let config = config.normalized();
        config.validate()?;

        let (idle_tx, idle_rx) = mpsc::channel(config.min_connections);
        let (shutdown_tx, _) = broadcast::channel(1);

        let shared = Arc::new(PoolShared {
            factory,
            address: config.address.clone(),
            min_connections: config.min_connections,
            max_connections: config.max_connections,
            idle_tx,
            idle_rx: Mutex::new(idle_rx),
            above_baseline: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            shutdown_tx,
        });

        let pool = Self { shared, config };

        for _ in 0..pool.config.min_connections {
            match pool.shared.factory.create(&pool.shared.address).await {
                Ok(conn) => {
                    // Queue capacity equals min_connections; pre-warm sends never overflow.
                    let _ = pool.shared.idle_tx.try_send(conn);
                }
                Err(e) => {
                    let _ = pool.shutdown().await;
                    return Err(PoolError::Factory(e));
                }
            }
        }

        info!(
            address = %pool.config.address,
            min = pool.config.min_connections,
            max = pool.config.max_connections,
            "connection pool pre-warmed"
        );

        Ok(pool)
    }

    /// Check out a connection.
    ///
    /// Tried in order: fail fast if the pool is shut down; hand out an
    /// idle connection; grow above the baseline if the ceiling allows;
    /// otherwise block until another caller releases a connection or
    /// shutdown fires.
    ///
    /// The blocking wait has **no internal timeout**: under sustained
    /// saturation with no releases, this call blocks indefinitely. Callers
    /// that need a deadline must impose one externally (for example with
    /// `tokio::time::timeout`) and must still release the connection if
    /// acquisition ultimately succeeds. No fairness is guaranteed among
    /// blocked callers beyond the channel's delivery order.
    pub async fn acquire(&self) -> Result<PooledConn<F>, PoolError> {
        let shared = &self.shared;

        if shared.is_closed() {
            return Err(PoolError::Closed);
        }

        // Fast path: an idle connection is ready. try_lock so that a
        // caller camped on the blocking wait below cannot stall us; if the
        // receiver is held, the queue is empty from our point of view.
        if let Ok(mut rx) = shared.idle_rx.try_lock()
            && let Ok(conn) = rx.try_recv()
        {
            debug!("reusing idle connection");
            return Ok(self.lease(conn));
        }

        // Grow above the baseline while the ceiling allows it. The slot is
        // held across the factory call and rolled back if creation fails.
        if shared.try_reserve_slot() {
            match shared.factory.create(&shared.address).await {
                Ok(conn) => {
                    debug!("created above-baseline connection");
                    return Ok(self.lease(conn));
                }
                Err(e) => {
                    shared.release_slot();
                    return Err(PoolError::Factory(e));
                }
            }
        }

        // Capacity exhausted: wait for a release or shutdown. Subscribing
        // before the re-check means a shutdown signal sent after the check
        // is always observed by the select below.
        let mut shutdown_rx = shared.subscribe_shutdown();
        if shared.is_closed() {
            return Err(PoolError::Closed);
        }

        let mut rx = shared.idle_rx.lock().await;
        tokio::select! {
            received = rx.recv() => match received {
                Some(conn) => {
                    debug!("handed released connection to blocked acquirer");
                    Ok(self.lease(conn))
                }
                None => Err(PoolError::Closed),
            },
            _ = shutdown_rx.recv() => Err(PoolError::Closed),
        }
    }

    /// Acquire a connection, run `f` against it, and release it on every
    /// exit path.
    ///
    /// `f`'s error is returned as [`PoolError::Factory`]; a failure to
    /// recycle the connection afterwards is logged and swallowed, since
    /// the caller's result takes precedence.
    pub async fn run_with<T, Func>(&self, f: Func) -> Result<T, PoolError>
    where
        Func: AsyncFnOnce(&mut F::Connection) -> anyhow::Result<T>,
    {
        let mut leased = self.acquire().await?;
        let result = f(&mut *leased).await;
        if let Err(e) = leased.release().await {
            debug!(error = %e, "failed to recycle connection after run_with");
        }
        result.map_err(PoolError::Factory)
    }

    /// Shut the pool down.
    ///
    /// Single-fire: the first call sets the shutdown signal, wakes every
    /// blocked acquirer, and drains the idle queue closing each parked
    /// connection; repeated or concurrent calls are safe no-ops.
    /// Connections currently checked out are not force-closed; they are
    /// closed lazily when their holder releases them.
    pub async fn shutdown(&self) -> Result<(), PoolError> {
        if self
            .shared
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let _ = self.shared.shutdown_tx.send(());
        self.shared.drain_idle().await;
        info!(address = %self.config.address, "connection pool shut down");
        Ok(())
    }

    /// Snapshot the pool's counters.
    pub fn status(&self) -> PoolStatus {
        let idle = self.shared.idle_tx.max_capacity() - self.shared.idle_tx.capacity();
        PoolStatus {
            idle: IdleConnections::new(idle),
            above_baseline: AboveBaseline::new(self.shared.above_baseline.load(Ordering::Acquire)),
            max_size: MaxPoolSize::new(self.config.max_connections),
        }
    }

    /// The normalized configuration this pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn lease(&self, conn: F::Connection) -> PooledConn<F> {
        PooledConn::new(conn, Arc::clone(&self.shared), self.config.idle_timeout)
    }
}

impl<F: ConnectionFactory> fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("address", &self.config.address)
            .field("min_connections", &self.config.min_connections)
            .field("max_connections", &self.config.max_connections)
            .field("closed", &self.shared.is_closed())
            .finish_non_exhaustive()
    }
}
