//! Tests for QueryExecutor retry behaviour.
//!
//! These run on tokio's paused clock, so backoff sleeps advance virtual time
//! instantly and elapsed time can be asserted exactly.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use common::{MockConnection, MockManager};
use storage::{ConnectionPool, DbError, PoolConfig, Query, QueryExecutor, RetryPolicy};
use tokio::time::Instant;

/// Fails with a query-level error `failures` times, then returns the id of
/// the connection it ran on.
struct FlakyQuery {
    failures: usize,
    attempts: AtomicUsize,
    seen: Mutex<Vec<usize>>,
}

impl FlakyQuery {
    fn new(failures: usize) -> Self {
        Self {
            failures,
            attempts: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Query<MockConnection> for FlakyQuery {
    type Output = usize;

    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn execute(&self, conn: &mut MockConnection) -> Result<usize, DbError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(conn.id);
        if attempt < self.failures {
            Err(DbError::Query("server closed the connection unexpectedly".to_string()))
        } else {
            Ok(conn.id)
        }
    }
}

/// Always fails with the given error kind.
struct BrokenQuery {
    retryable: bool,
    attempts: AtomicUsize,
}

#[async_trait]
impl Query<MockConnection> for BrokenQuery {
    type Output = ();

    async fn execute(&self, _conn: &mut MockConnection) -> Result<(), DbError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.retryable {
            Err(DbError::Query("relation does not exist".to_string()))
        } else {
            Err(DbError::Decode("column geometry is not text".to_string()))
        }
    }
}

async fn executor(manager: MockManager, policy: RetryPolicy) -> QueryExecutor<MockManager> {
    let pool = ConnectionPool::new(
        manager,
        PoolConfig {
            initial_size: 1,
            seed_free_list: true,
        },
    )
    .await
    .unwrap();
    QueryExecutor::new(pool, policy)
}

fn seconds_policy() -> RetryPolicy {
    RetryPolicy {
        unit: Duration::from_secs(1),
        ceiling: 64,
        max_retries: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_success_first_time_does_not_sleep() {
    let exec = executor(MockManager::new(), seconds_policy()).await;
    let query = FlakyQuery::new(0);

    let start = Instant::now();
    let id = exec.run(&query).await.unwrap();

    assert_eq!(id, 0);
    assert_eq!(query.attempts(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(exec.pool().status().reinitialized, 0);
}

#[tokio::test(start_paused = true)]
async fn test_retries_until_success_with_backoff() {
    let exec = executor(MockManager::new(), seconds_policy()).await;
    let query = FlakyQuery::new(3);

    let start = Instant::now();
    exec.run(&query).await.unwrap();

    assert_eq!(query.attempts(), 4);
    // 0 + 1 + 2 seconds
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_holds_at_ceiling() {
    let exec = executor(MockManager::new(), seconds_policy()).await;
    let query = FlakyQuery::new(10);

    let start = Instant::now();
    exec.run(&query).await.unwrap();

    // 0 + 1 + 2 + 4 + 8 + 16 + 32 + 64 + 64 + 64
    assert_eq!(query.attempts(), 11);
    assert_eq!(start.elapsed(), Duration::from_secs(255));
}

#[tokio::test(start_paused = true)]
async fn test_each_retry_runs_on_a_reinitialized_connection() {
    let manager = MockManager::new();
    let exec = executor(manager.clone(), seconds_policy()).await;
    let query = FlakyQuery::new(2);

    let id = exec.run(&query).await.unwrap();

    let seen = query.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(id, 2);
    assert_eq!(manager.closed(), vec![0, 1]);
    assert_eq!(exec.pool().status().reinitialized, 2);
    assert_eq!(exec.pool().status().available, 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_query_error_propagates_immediately() {
    let exec = executor(MockManager::new(), seconds_policy()).await;
    let query = BrokenQuery {
        retryable: false,
        attempts: AtomicUsize::new(0),
    };

    let start = Instant::now();
    let result = exec.run(&query).await;

    assert!(matches!(result, Err(DbError::Decode(_))));
    assert_eq!(query.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(exec.pool().status().available, 1);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_during_retry_propagates() {
    let manager = MockManager::new();
    let exec = executor(manager.clone(), seconds_policy()).await;
    let query = FlakyQuery::new(1);

    // The retry has to reopen the slot, which now fails.
    manager.set_fail_connect(true);
    let result = exec.run(&query).await;

    assert!(matches!(result, Err(DbError::Connect(_))));
    assert_eq!(query.attempts(), 1);
    assert_eq!(exec.pool().status().available, 1);
}

#[tokio::test(start_paused = true)]
async fn test_max_retries_gives_up() {
    let policy = RetryPolicy {
        max_retries: Some(2),
        ..seconds_policy()
    };
    let exec = executor(MockManager::new(), policy).await;
    let query = BrokenQuery {
        retryable: true,
        attempts: AtomicUsize::new(0),
    };

    let start = Instant::now();
    let result = exec.run(&query).await;

    match result {
        Err(DbError::RetriesExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("relation does not exist"));
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }
    assert_eq!(query.attempts.load(Ordering::SeqCst), 3);
    // 0 + 1 seconds
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_unit_scales_delays() {
    let policy = RetryPolicy {
        unit: Duration::from_millis(100),
        ..seconds_policy()
    };
    let exec = executor(MockManager::new(), policy).await;
    let query = FlakyQuery::new(4);

    let start = Instant::now();
    exec.run(&query).await.unwrap();

    // (0 + 1 + 2 + 4) * 100ms
    assert_eq!(start.elapsed(), Duration::from_millis(700));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_share_pool() {
    let exec = executor(MockManager::new(), seconds_policy()).await;

    let mut handles = Vec::new();
    for failures in 0..6 {
        let exec = exec.clone();
        handles.push(tokio::spawn(async move {
            let query = FlakyQuery::new(failures % 2);
            exec.run(&query).await.map(|_| query.attempts())
        }));
    }

    for handle in handles {
        let attempts = handle.await.unwrap().unwrap();
        assert!(attempts == 1 || attempts == 2);
    }

    let status = exec.pool().status();
    assert_eq!(status.available, status.slots);
}
