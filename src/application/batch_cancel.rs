//! # Batch Cancel Orchestrator
//!
//! Cancels every selected enrollment through the concurrency controller. Each
//! item gets a bounded number of attempts with a fixed delay in between; an item
//! that exhausts its attempts becomes a failed outcome, never an error of the
//! whole batch.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::application::concurrency::{ConcurrencyController, TaskOutcome};
use crate::application::progress::ProgressTracker;
use crate::domain::{
    ActivityApi, ActivityGroupItem, BatchSummary, CancelOutcome, CancelRequest, CancelStatus,
};

/// Input rejected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    #[error("请先选择要取消的活动")]
    NothingSelected,

    #[error("请填写取消原因")]
    MissingReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per item, first one included
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_secs(1) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchCancelReport {
    /// Same order as the submitted items
    pub outcomes: Vec<CancelOutcome>,
    pub success_count: usize,
    pub failed_count: usize,
    pub summary: BatchSummary,
}

impl BatchCancelReport {
    fn from_outcomes(outcomes: Vec<CancelOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.is_success()).count();
        let failed_count = outcomes.len() - success_count;
        Self {
            outcomes,
            success_count,
            failed_count,
            summary: BatchSummary::from_counts(success_count, failed_count),
        }
    }

    #[must_use]
    pub fn message(&self) -> String {
        self.summary.message(self.success_count, self.failed_count)
    }
}

pub struct BatchCancelOrchestrator {
    api: Arc<dyn ActivityApi>,
    controller: ConcurrencyController,
    progress: ProgressTracker,
    retry: RetryPolicy,
}

impl BatchCancelOrchestrator {
    #[must_use]
    pub fn new(
        api: Arc<dyn ActivityApi>,
        controller: ConcurrencyController,
        progress: ProgressTracker,
        retry: RetryPolicy,
    ) -> Self {
        Self { api, controller, progress, retry }
    }

    pub async fn cancel_all(
        &self,
        items: &[ActivityGroupItem],
        reason: &str,
    ) -> Result<BatchCancelReport, CancelError> {
        if items.is_empty() {
            return Err(CancelError::NothingSelected);
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CancelError::MissingReason);
        }

        info!("🗑️ Cancelling {} enrollments (reason: {})", items.len(), reason);
        self.progress.start(items.len());

        let tasks: Vec<_> = items
            .iter()
            .map(|item| {
                let api = Arc::clone(&self.api);
                let retry = self.retry;
                let request = CancelRequest {
                    product_id: item.product_id().to_string(),
                    enroll_id: item.enroll_id().to_string(),
                    activity_name: item.activity_name().to_string(),
                    remark: reason.to_string(),
                };
                move || async move { Ok::<_, Infallible>(cancel_with_retry(api.as_ref(), request, retry).await) }
            })
            .collect();

        let outcomes = self
            .controller
            .execute_with(tasks, |outcome| {
                let (success, label) = match outcome {
                    TaskOutcome::Success { value, .. } => {
                        (value.is_success(), format!("{} - {}", value.product_id, value.activity_name))
                    }
                    TaskOutcome::Failure { .. } => (false, String::new()),
                };
                self.progress.record(success, label);
            })
            .await;

        let outcomes: Vec<CancelOutcome> = outcomes
            .into_iter()
            .zip(items)
            .map(|(outcome, item)| match outcome {
                TaskOutcome::Success { value, .. } => value,
                TaskOutcome::Failure { error, .. } => CancelOutcome {
                    product_id: item.product_id().to_string(),
                    enroll_id: item.enroll_id().to_string(),
                    activity_name: item.activity_name().to_string(),
                    status: CancelStatus::Failed,
                    error: Some(error),
                    retries: 0,
                },
            })
            .collect();

        let report = BatchCancelReport::from_outcomes(outcomes);
        self.progress.set_results(report.outcomes.clone());
        info!("📊 {}", report.message());
        Ok(report)
    }
}

async fn cancel_with_retry(
    api: &dyn ActivityApi,
    request: CancelRequest,
    retry: RetryPolicy,
) -> CancelOutcome {
    let max_attempts = retry.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 0..max_attempts {
        if attempt > 0 {
            debug!("🔄 Retrying cancel of {} (attempt {}/{})", request.enroll_id, attempt + 1, max_attempts);
            tokio::time::sleep(retry.delay).await;
        }

        match api.cancel_activity(&request).await {
            Ok(()) => {
                return CancelOutcome {
                    product_id: request.product_id,
                    enroll_id: request.enroll_id,
                    activity_name: request.activity_name,
                    status: CancelStatus::Success,
                    error: None,
                    retries: attempt,
                };
            }
            Err(e) => {
                warn!("⚠️ Cancel of {} failed on attempt {}: {}", request.enroll_id, attempt + 1, e);
                last_error = e.to_string();
            }
        }
    }

    CancelOutcome {
        product_id: request.product_id,
        enroll_id: request.enroll_id,
        activity_name: request.activity_name,
        status: CancelStatus::Failed,
        error: Some(last_error),
        retries: max_attempts - 1,
    }
}
