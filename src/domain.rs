//! Domain module - SPU input, activity model, grouping and selection
//!
//! Pure data and pure functions; nothing in here touches the network.

pub mod spu_input;
pub mod activity;
pub mod activity_group;
pub mod selection;
pub mod outcome;
pub mod report;
pub mod product_listing;
pub mod services;

// Re-export commonly used items for convenience
pub use spu_input::{ParsedInput, ParseStats, SpuErrorReason, SpuInputError, parse_spu_input};
pub use activity::{
    ActivityEnrollment, ProductActivity, ProductActivityResult, ProductInfo, SessionStatus,
    SiteSession,
};
pub use activity_group::{ActivityGroup, ActivityGroupItem, ActivityGroups, group_activities};
pub use selection::SelectionSummary;
pub use outcome::{BatchProgress, BatchSummary, CancelOutcome, CancelStatus};
pub use report::{ExportRow, ReportLocale, to_rows};
pub use product_listing::{ListedProduct, ProductListQuery, ProductPage};
pub use services::{
    ActivityApi, ApiError, CancelRequest, ExportError, ExportSink, ProductCatalogApi,
};
