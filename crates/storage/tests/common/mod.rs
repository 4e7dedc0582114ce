//! In-memory connection manager for pool and executor tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use storage::{DbError, Manager};

/// A fake connection; `id` is unique per successful `connect`.
#[derive(Debug)]
pub struct MockConnection {
    pub id: usize,
}

#[derive(Default)]
struct MockState {
    next_id: AtomicUsize,
    connects: AtomicUsize,
    fail_connect: AtomicBool,
    closed: Mutex<Vec<usize>>,
}

/// Cloneable handle; clones share counters so tests can observe the pool's manager.
#[derive(Clone, Default)]
pub struct MockManager {
    state: Arc<MockState>,
}

impl MockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `connect` calls fail (or succeed again).
    pub fn set_fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Successful connects so far.
    pub fn connects(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// Ids of connections closed by reinitialization, in order.
    pub fn closed(&self) -> Vec<usize> {
        self.state.closed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Manager for MockManager {
    type Connection = MockConnection;

    async fn connect(&self) -> Result<MockConnection, DbError> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(DbError::Connect("connection refused".to_string()));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection { id })
    }

    async fn close(&self, conn: MockConnection) {
        self.state.closed.lock().unwrap().push(conn.id);
    }
}
