//! Batch session - state of one interactive cancellation run
//!
//! Owns everything a presentation layer needs between phases: the parsed
//! input, per-product query results, the activity groups with their selection
//! flags, the cancel reason and the last cancel report. Mutation happens only
//! through `&mut self` between phases; the orchestrators work on snapshots.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::application::batch_cancel::{BatchCancelOrchestrator, BatchCancelReport, CancelError, RetryPolicy};
use crate::application::batch_query::{BatchQueryOrchestrator, BatchQueryResult, ProductQueryFailure};
use crate::application::concurrency::{ConcurrencyController, ConcurrencyError};
use crate::application::progress::{ProgressReceiver, ProgressTracker};
use crate::domain::report::suggested_export_name;
use crate::domain::spu_input::is_valid_spu;
use crate::domain::{
    ActivityApi, ActivityGroups, ApiError, BatchProgress, ExportError, ExportSink, ParsedInput,
    ProductActivityResult, ReportLocale, group_activities, parse_spu_input, to_rows,
};

const DEFAULT_CONCURRENCY: usize = 3;
const DEFAULT_CANCEL_REASON: &str = "申请退出";

/// Knobs a session is built with; the entry point maps its config onto these
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Parallel requests for both query and cancel phases
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub locale: ReportLocale,
    pub default_reason: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            locale: ReportLocale::Zh,
            default_reason: DEFAULT_CANCEL_REASON.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("请输入有效的SPU列表")]
    NoValidIds,

    #[error("SPU格式错误: {0}")]
    InvalidSpu(String),

    #[error("没有可导出的结果")]
    NoResults,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cancel(#[from] CancelError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub struct BatchSession {
    api: Arc<dyn ActivityApi>,
    sink: Arc<dyn ExportSink>,
    query: BatchQueryOrchestrator,
    cancel: BatchCancelOrchestrator,
    progress: ProgressTracker,
    locale: ReportLocale,
    default_reason: String,

    parsed: Option<ParsedInput>,
    products: Vec<ProductActivityResult>,
    failures: Vec<ProductQueryFailure>,
    groups: ActivityGroups,
    cancel_reason: String,
    last_report: Option<BatchCancelReport>,
}

impl BatchSession {
    pub fn new(
        api: Arc<dyn ActivityApi>,
        sink: Arc<dyn ExportSink>,
        settings: SessionSettings,
    ) -> Result<Self, ConcurrencyError> {
        let controller = ConcurrencyController::new(settings.concurrency)?;
        let progress = ProgressTracker::new();

        Ok(Self {
            query: BatchQueryOrchestrator::new(Arc::clone(&api), controller.clone(), progress.clone()),
            cancel: BatchCancelOrchestrator::new(
                Arc::clone(&api),
                controller,
                progress.clone(),
                settings.retry,
            ),
            api,
            sink,
            progress,
            locale: settings.locale,
            cancel_reason: settings.default_reason.clone(),
            default_reason: settings.default_reason,
            parsed: None,
            products: Vec::new(),
            failures: Vec::new(),
            groups: ActivityGroups::default(),
            last_report: None,
        })
    }

    /// Parses free text and keeps the result for the next `query_parsed`.
    pub fn parse_input(&mut self, text: &str) -> &ParsedInput {
        let parsed = parse_spu_input(text);
        info!("📝 {}", parsed.summary());
        self.parsed.insert(parsed)
    }

    #[must_use]
    pub const fn parsed(&self) -> Option<&ParsedInput> {
        self.parsed.as_ref()
    }

    /// Queries every parsed id and rebuilds the activity groups.
    pub async fn query_parsed(&mut self) -> Result<&ActivityGroups, SessionError> {
        let ids = match &self.parsed {
            Some(parsed) if !parsed.is_empty() => parsed.ids.clone(),
            _ => return Err(SessionError::NoValidIds),
        };

        let BatchQueryResult { succeeded, failed } = self.query.query_all(&ids).await;
        self.install_products(succeeded, failed);
        Ok(&self.groups)
    }

    /// Queries one product directly, bypassing the parsed input.
    pub async fn query_single(&mut self, product_id: &str) -> Result<&ProductActivityResult, SessionError> {
        let product_id = product_id.trim();
        if !is_valid_spu(product_id) {
            return Err(SessionError::InvalidSpu(product_id.to_string()));
        }

        let result = self.api.query_activities(product_id).await?;
        self.install_products(vec![result], Vec::new());
        self.products.first().ok_or(SessionError::NoResults)
    }

    fn install_products(&mut self, products: Vec<ProductActivityResult>, failures: Vec<ProductQueryFailure>) {
        self.groups = group_activities(&products);
        self.products = products;
        self.failures = failures;
        self.last_report = None;
        info!(
            "📦 {} activity groups across {} products ({} failed)",
            self.groups.len(),
            self.products.len(),
            self.failures.len()
        );
    }

    #[must_use]
    pub fn products(&self) -> &[ProductActivityResult] {
        &self.products
    }

    #[must_use]
    pub fn query_failures(&self) -> &[ProductQueryFailure] {
        &self.failures
    }

    #[must_use]
    pub const fn groups(&self) -> &ActivityGroups {
        &self.groups
    }

    /// Selection and expansion changes go through here
    pub fn groups_mut(&mut self) -> &mut ActivityGroups {
        &mut self.groups
    }

    #[must_use]
    pub fn cancel_reason(&self) -> &str {
        &self.cancel_reason
    }

    pub fn set_cancel_reason(&mut self, reason: impl Into<String>) {
        self.cancel_reason = reason.into();
    }

    /// Cancels every selected enrollment with the current reason.
    pub async fn cancel_selected(&mut self) -> Result<&BatchCancelReport, SessionError> {
        let items = self.groups.selected_items();
        let report = self.cancel.cancel_all(&items, &self.cancel_reason).await?;
        Ok(self.last_report.insert(report))
    }

    #[must_use]
    pub const fn last_report(&self) -> Option<&BatchCancelReport> {
        self.last_report.as_ref()
    }

    /// Writes the last cancel report through the export sink.
    pub fn export_results(&self) -> Result<PathBuf, SessionError> {
        let report = self.last_report.as_ref().ok_or(SessionError::NoResults)?;
        let rows = to_rows(&report.outcomes, self.locale);
        let name = suggested_export_name(self.locale, &Local::now());
        Ok(self.sink.export(&rows, &name)?)
    }

    #[must_use]
    pub fn subscribe_progress(&self) -> ProgressReceiver {
        self.progress.subscribe()
    }

    #[must_use]
    pub fn progress(&self) -> BatchProgress {
        self.progress.snapshot()
    }

    /// Drops parsed input, query results, groups, progress and the last report.
    pub fn clear_results(&mut self) {
        self.parsed = None;
        self.products.clear();
        self.failures.clear();
        self.groups = ActivityGroups::default();
        self.last_report = None;
        self.progress.clear();
    }

    /// `clear_results` plus the default cancel reason.
    pub fn reset(&mut self) {
        self.clear_results();
        self.cancel_reason.clone_from(&self.default_reason);
    }
}
