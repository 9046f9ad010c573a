//! # Concurrency Controller
//!
//! Bounded worker pool over a logical task queue. At most `limit` tasks are in
//! flight; as soon as one settles the next queued task starts. Every task is
//! awaited independently, a failing or panicking task never aborts its
//! siblings, and the returned outcomes are ordered by input index regardless of
//! completion order.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use futures::future::join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyError {
    #[error("Concurrency limit must be positive, got {0}")]
    InvalidLimit(usize),
}

/// Settled result of one task, tagged with its input index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome<T> {
    Success { value: T, duration_ms: u64, index: usize },
    Failure { error: String, index: usize },
}

impl<T> TaskOutcome<T> {
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Success { index, .. } | Self::Failure { index, .. } => *index,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            Self::Success { value, .. } => Ok(value),
            Self::Failure { error, .. } => Err(error),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("task panicked: {detail}")
}

/// Decrements the running count even if the task future is dropped mid-flight
struct RunningGuard<'a>(&'a AtomicUsize);

impl<'a> RunningGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Reusable bounded-parallelism task runner
#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    limit: usize,
    permits: Arc<Semaphore>,
    running: Arc<AtomicUsize>,
}

impl ConcurrencyController {
    pub fn new(limit: usize) -> Result<Self, ConcurrencyError> {
        if limit == 0 {
            return Err(ConcurrencyError::InvalidLimit(limit));
        }
        Ok(Self {
            limit,
            permits: Arc::new(Semaphore::new(limit)),
            running: Arc::new(AtomicUsize::new(0)),
        })
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Tasks currently executing
    #[must_use]
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs every task and returns one outcome per task, in input order.
    pub async fn execute<T, E, F, Fut>(&self, tasks: Vec<F>) -> Vec<TaskOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.execute_with(tasks, |_| {}).await
    }

    /// Like [`execute`](Self::execute), calling `on_settled` as each task settles
    /// (in completion order).
    pub async fn execute_with<T, E, F, Fut, S>(
        &self,
        tasks: Vec<F>,
        on_settled: S,
    ) -> Vec<TaskOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        S: Fn(&TaskOutcome<T>),
    {
        let total = tasks.len();
        debug!("🚦 Executing {} tasks (limit: {})", total, self.limit);

        let on_settled = &on_settled;
        let runs = tasks.into_iter().enumerate().map(|(index, task)| async move {
            let outcome = self.run_one(index, task).await;
            on_settled(&outcome);
            outcome
        });

        let outcomes = join_all(runs).await;
        debug!(
            "🏁 Executed {} tasks: {} succeeded",
            total,
            outcomes.iter().filter(|o| o.is_success()).count()
        );
        outcomes
    }

    async fn run_one<T, E, F, Fut>(&self, index: usize, task: F) -> TaskOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let _permit = match self.permits.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                return TaskOutcome::Failure { error: e.to_string(), index };
            }
        };

        let _running = RunningGuard::enter(&self.running);
        let started = Instant::now();

        let settled = AssertUnwindSafe(async move { task().await }).catch_unwind().await;
        match settled {
            Ok(Ok(value)) => TaskOutcome::Success {
                value,
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                index,
            },
            Ok(Err(e)) => {
                warn!("⚠️ Task {} failed: {}", index, e);
                TaskOutcome::Failure { error: e.to_string(), index }
            }
            Err(payload) => {
                let error = panic_message(payload.as_ref());
                warn!("💥 Task {} aborted: {}", index, error);
                TaskOutcome::Failure { error, index }
            }
        }
    }
}
