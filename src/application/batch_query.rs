//! # Batch Query Orchestrator
//!
//! Queries every product id through the concurrency controller. Partial failure
//! is normal: each id ends up either in `succeeded` or in `failed`. Queries are
//! not retried.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::concurrency::{ConcurrencyController, TaskOutcome};
use crate::application::progress::ProgressTracker;
use crate::domain::{ActivityApi, ProductActivityResult};

/// A product id whose query failed, with the error message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductQueryFailure {
    pub product_id: String,
    pub error: String,
}

/// Results of one batch, both lists in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchQueryResult {
    pub succeeded: Vec<ProductActivityResult>,
    pub failed: Vec<ProductQueryFailure>,
}

impl BatchQueryResult {
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Enrollments across every successful product
    #[must_use]
    pub fn enrollment_count(&self) -> usize {
        self.succeeded.iter().map(ProductActivityResult::enrollment_count).sum()
    }
}

pub struct BatchQueryOrchestrator {
    api: Arc<dyn ActivityApi>,
    controller: ConcurrencyController,
    progress: ProgressTracker,
}

impl BatchQueryOrchestrator {
    #[must_use]
    pub fn new(
        api: Arc<dyn ActivityApi>,
        controller: ConcurrencyController,
        progress: ProgressTracker,
    ) -> Self {
        Self { api, controller, progress }
    }

    pub async fn query_all(&self, ids: &[String]) -> BatchQueryResult {
        info!("🔍 Querying activities for {} products (concurrency: {})", ids.len(), self.controller.limit());
        self.progress.start(ids.len());

        let tasks: Vec<_> = ids
            .iter()
            .map(|id| {
                let api = Arc::clone(&self.api);
                let id = id.clone();
                move || async move { api.query_activities(&id).await }
            })
            .collect();

        let outcomes = self
            .controller
            .execute_with(tasks, |outcome| {
                let label = ids.get(outcome.index()).cloned().unwrap_or_default();
                self.progress.record(outcome.is_success(), label);
            })
            .await;

        let mut result = BatchQueryResult::default();
        for outcome in outcomes {
            let product_id = ids.get(outcome.index()).cloned().unwrap_or_default();
            match outcome {
                TaskOutcome::Success { value, .. } => result.succeeded.push(value),
                TaskOutcome::Failure { error, .. } => {
                    warn!("⚠️ Query failed for product {}: {}", product_id, error);
                    result.failed.push(ProductQueryFailure { product_id, error });
                }
            }
        }

        info!(
            "✅ Query finished: {} succeeded, {} failed, {} enrollments found",
            result.succeeded.len(),
            result.failed.len(),
            result.enrollment_count()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::FakeActivityApi;
    use crate::domain::activity_group::test_support::product;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    fn orchestrator(api: Arc<FakeActivityApi>, tracker: ProgressTracker) -> BatchQueryOrchestrator {
        BatchQueryOrchestrator::new(api, ConcurrencyController::new(3).unwrap(), tracker)
    }

    #[tokio::test]
    async fn partitions_successes_and_failures() {
        let api = Arc::new(
            FakeActivityApi::new()
                .with_product(product("1000000001", &[("Flash Sale", &["e1", "e2"])]))
                .with_product(product("1000000003", &[])),
        );
        let tracker = ProgressTracker::new();

        let result = orchestrator(Arc::clone(&api), tracker.clone())
            .query_all(&ids(&["1000000001", "1000000002", "1000000003"]))
            .await;

        assert_eq!(result.total(), 3);
        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.succeeded[0].info.product_id, "1000000001");
        assert!(result.succeeded[1].activities.is_empty());
        assert_eq!(result.enrollment_count(), 2);
        assert_eq!(result.failed, vec![ProductQueryFailure {
            product_id: "1000000002".into(),
            error: "未找到商品信息: 1000000002".into(),
        }]);

        let progress = tracker.snapshot();
        assert_eq!((progress.total, progress.completed, progress.failed), (3, 3, 1));
        assert_eq!(api.query_calls(), 3);
    }

    #[tokio::test]
    async fn failures_are_not_retried() {
        let api = Arc::new(FakeActivityApi::new());
        let result = orchestrator(Arc::clone(&api), ProgressTracker::new())
            .query_all(&ids(&["1000000009"]))
            .await;

        assert_eq!(result.failed.len(), 1);
        assert_eq!(api.query_calls(), 1);
    }

    #[tokio::test]
    async fn empty_id_list_makes_no_calls() {
        let api = Arc::new(FakeActivityApi::new());
        let result = orchestrator(Arc::clone(&api), ProgressTracker::new()).query_all(&[]).await;

        assert_eq!(result.total(), 0);
        assert_eq!(api.query_calls(), 0);
    }
}
