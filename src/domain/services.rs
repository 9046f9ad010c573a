//! Domain services
//!
//! Interfaces of the collaborators the batch workflow and the product listing
//! talk to. The portal client and the CSV sink in `infrastructure` implement
//! them; tests use in-memory fakes.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::activity::ProductActivityResult;
use crate::domain::product_listing::{ListedProduct, ProductListQuery, ProductPage};
use crate::domain::report::ExportRow;

/// Failure of a single remote call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("未找到商品信息: {product_id}")]
    NotFound { product_id: String },

    #[error("{message}")]
    Rejected { message: String },

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("请先登录并选择站点")]
    NotAuthenticated,
}

/// Body of the cancel endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub product_id: String,
    pub enroll_id: String,
    pub activity_name: String,
    pub remark: String,
}

/// Remote activity endpoints of the seller portal
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// Activities the product is enrolled in
    async fn query_activities(&self, product_id: &str) -> Result<ProductActivityResult, ApiError>;

    /// Withdraws one enrollment
    async fn cancel_activity(&self, request: &CancelRequest) -> Result<(), ApiError>;
}

/// Product listing endpoint of the seller portal
#[async_trait]
pub trait ProductCatalogApi: Send + Sync {
    async fn list_products(&self, query: &ProductListQuery) -> Result<ProductPage, ApiError>;
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export")]
    Empty,

    #[error("Failed to write export file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Persists flat rows and reports where they went
pub trait ExportSink: Send + Sync {
    fn export(&self, rows: &[ExportRow], suggested_name: &str) -> Result<PathBuf, ExportError>;

    fn export_products(
        &self,
        products: &[ListedProduct],
        suggested_name: &str,
    ) -> Result<PathBuf, ExportError>;
}
