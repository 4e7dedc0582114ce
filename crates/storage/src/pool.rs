//! Growable connection pool.
//!
//! Connections live in indexed slots that are never removed. A lock-free
//! queue holds the indices of slots that are not checked out. When the queue
//! is empty the pool grows by one slot instead of waiting, so capacity tracks
//! peak concurrency and is kept for the life of the process.
//!
//! A slot can be reinitialized: the next time it is drawn from the free list
//! its connection is closed and reopened before being handed out.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_queue::SegQueue;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::DbError;
use crate::manager::Manager;

/// Pool construction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Connections opened eagerly at construction.
    #[serde(default = "default_initial_size")]
    pub initial_size: usize,

    /// Push the initial connections onto the free list.
    ///
    /// When false the initial batch is created but never offered, so the
    /// first `initial_size` acquisitions each grow the pool.
    #[serde(default = "default_seed_free_list")]
    pub seed_free_list: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: default_initial_size(),
            seed_free_list: default_seed_free_list(),
        }
    }
}

fn default_initial_size() -> usize {
    4
}

fn default_seed_free_list() -> bool {
    true
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Slots ever allocated (initial batch plus growth).
    pub slots: usize,
    /// Slot indices currently on the free list.
    pub available: usize,
    /// Connections opened through the growth path.
    pub grown: u64,
    /// Connections replaced through reinitialization.
    pub reinitialized: u64,
}

struct Slot<C> {
    conn: Mutex<Option<C>>,
    reinit: AtomicBool,
}

impl<C> Slot<C> {
    fn new(conn: Option<C>) -> Self {
        Self {
            conn: Mutex::new(conn),
            reinit: AtomicBool::new(false),
        }
    }

    fn take(&self) -> Option<C> {
        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn put(&self, conn: C) {
        *self.conn.lock().unwrap_or_else(PoisonError::into_inner) = Some(conn);
    }
}

struct PoolInner<M: Manager> {
    manager: M,
    slots: RwLock<Vec<Arc<Slot<M::Connection>>>>,
    free: SegQueue<usize>,
    /// Number of slots allocated. Guards the grow path; only ever increases.
    size: tokio::sync::Mutex<usize>,
    grown: AtomicU64,
    reinitialized: AtomicU64,
}

/// A pool of database connections. Cheap to clone.
pub struct ConnectionPool<M: Manager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: Manager> Clone for ConnectionPool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Manager> ConnectionPool<M> {
    /// Open `config.initial_size` connections and build the pool.
    ///
    /// The first connection failure aborts construction.
    pub async fn new(manager: M, config: PoolConfig) -> Result<Self, DbError> {
        let mut slots = Vec::with_capacity(config.initial_size);
        for _ in 0..config.initial_size {
            slots.push(Arc::new(Slot::new(Some(manager.connect().await?))));
        }

        let free = SegQueue::new();
        if config.seed_free_list {
            for index in 0..slots.len() {
                free.push(index);
            }
        }

        info!(
            initial_size = config.initial_size,
            seed_free_list = config.seed_free_list,
            "Connection pool ready"
        );
        metrics::gauge!("db_pool_slots").set(slots.len() as f64);

        Ok(Self {
            inner: Arc::new(PoolInner {
                manager,
                size: tokio::sync::Mutex::new(slots.len()),
                slots: RwLock::new(slots),
                free,
                grown: AtomicU64::new(0),
                reinitialized: AtomicU64::new(0),
            }),
        })
    }

    /// Check out a connection.
    ///
    /// Takes a free slot if one is available, otherwise grows the pool by one
    /// slot. With `reinitialize` set, a slot drawn from the free list has its
    /// connection reopened first; a freshly grown slot is always new.
    ///
    /// The slot returns to the free list when the guard is dropped.
    pub async fn acquire(&self, reinitialize: bool) -> Result<PooledConnection<M>, DbError> {
        match self.inner.free.pop() {
            Some(index) => self.checkout(index, reinitialize).await,
            None => self.grow().await,
        }
    }

    async fn checkout(&self, index: usize, reinitialize: bool) -> Result<PooledConnection<M>, DbError> {
        let slot = self.slot(index)?;

        // From here on the guard owns the index, so it goes back on the free
        // list even if this future is dropped while reconnecting.
        let mut guard = PooledConnection {
            pool: self.clone(),
            slot: Arc::clone(&slot),
            index,
            conn: None,
        };

        let flagged = slot.reinit.swap(false, Ordering::AcqRel);
        match slot.take() {
            Some(conn) if !(reinitialize || flagged) => {
                guard.conn = Some(conn);
            }
            existing => {
                if let Some(old) = existing {
                    debug!(slot = index, "Reinitializing connection");
                    self.inner.manager.close(old).await;
                }
                let conn = self.inner.manager.connect().await?;
                self.inner.reinitialized.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("db_pool_reinit_total").increment(1);
                guard.conn = Some(conn);
            }
        }

        Ok(guard)
    }

    #[instrument(skip(self))]
    async fn grow(&self) -> Result<PooledConnection<M>, DbError> {
        let mut size = self.inner.size.lock().await;

        // The counter moves only once the connection exists, so a failed or
        // cancelled open leaves the pool unchanged.
        let conn = self.inner.manager.connect().await?;
        let index = *size;
        let slot = Arc::new(Slot::new(None));
        self.inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&slot));
        *size += 1;

        self.inner.grown.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("db_pool_grow_total").increment(1);
        metrics::gauge!("db_pool_slots").set(*size as f64);
        info!(slot = index, slots = *size, "Connection pool grew");

        Ok(PooledConnection {
            pool: self.clone(),
            slot,
            index,
            conn: Some(conn),
        })
    }

    fn slot(&self, index: usize) -> Result<Arc<Slot<M::Connection>>, DbError> {
        self.inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
            .ok_or_else(|| DbError::Pool(format!("Unknown slot index {}", index)))
    }

    /// Flag slot `index` so that its next draw from the free list reopens it.
    pub fn mark_for_reinit(&self, index: usize) -> Result<(), DbError> {
        self.slot(index)?.reinit.store(true, Ordering::Release);
        Ok(())
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            slots: self
                .inner
                .slots
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            available: self.inner.free.len(),
            grown: self.inner.grown.load(Ordering::Relaxed),
            reinitialized: self.inner.reinitialized.load(Ordering::Relaxed),
        }
    }
}

/// A checked-out connection. Returns its slot to the pool on drop.
pub struct PooledConnection<M: Manager> {
    pool: ConnectionPool<M>,
    slot: Arc<Slot<M::Connection>>,
    index: usize,
    conn: Option<M::Connection>,
}

impl<M: Manager> PooledConnection<M> {
    /// Stable index of the slot this connection occupies.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Reopen this slot's connection the next time it is drawn from the free list.
    pub fn mark_for_reinit(&self) {
        self.slot.reinit.store(true, Ordering::Release);
    }
}

impl<M: Manager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        // Only `None` while a checkout is still reconnecting, before the
        // guard is handed out.
        self.conn.as_ref().unwrap()
    }
}

impl<M: Manager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().unwrap()
    }
}

impl<M: Manager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.slot.put(conn);
        }
        self.pool.inner.free.push(self.index);
    }
}

impl<M: Manager> std::fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("index", &self.index)
            .finish()
    }
}
