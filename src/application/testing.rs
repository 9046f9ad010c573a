//! In-memory portal and export sink used by the application-layer unit tests

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{
    ActivityApi, ApiError, CancelRequest, ExportError, ExportRow, ExportSink, ListedProduct,
    ProductActivityResult, ProductCatalogApi, ProductListQuery, ProductPage,
};

#[derive(Default)]
pub struct FakeActivityApi {
    products: HashMap<String, ProductActivityResult>,
    /// enroll id -> number of leading cancel attempts that fail
    cancel_failures: HashMap<String, u32>,
    query_calls: AtomicUsize,
    cancel_attempts: Mutex<HashMap<String, u32>>,
    cancel_requests: Mutex<Vec<CancelRequest>>,
}

impl FakeActivityApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(mut self, product: ProductActivityResult) -> Self {
        self.products.insert(product.info.product_id.clone(), product);
        self
    }

    pub fn failing_cancels(mut self, enroll_id: &str, failures: u32) -> Self {
        self.cancel_failures.insert(enroll_id.to_string(), failures);
        self
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_requests(&self) -> Vec<CancelRequest> {
        self.cancel_requests.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, enroll_id: &str) -> u32 {
        self.cancel_attempts.lock().unwrap().get(enroll_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl ActivityApi for FakeActivityApi {
    async fn query_activities(&self, product_id: &str) -> Result<ProductActivityResult, ApiError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.products
            .get(product_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound { product_id: product_id.to_string() })
    }

    async fn cancel_activity(&self, request: &CancelRequest) -> Result<(), ApiError> {
        self.cancel_requests.lock().unwrap().push(request.clone());
        let attempt = {
            let mut attempts = self.cancel_attempts.lock().unwrap();
            let count = attempts.entry(request.enroll_id.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let failures = self.cancel_failures.get(&request.enroll_id).copied().unwrap_or(0);
        if attempt <= failures {
            Err(ApiError::Rejected { message: format!("活动 {} 暂不可取消", request.enroll_id) })
        } else {
            Ok(())
        }
    }
}

/// Serves one fixed listing page, or a fixed error
pub struct FakeCatalog {
    page: Result<ProductPage, ApiError>,
    queries: Mutex<Vec<ProductListQuery>>,
}

impl FakeCatalog {
    pub fn serving(page: ProductPage) -> Self {
        Self { page: Ok(page), queries: Mutex::new(Vec::new()) }
    }

    pub fn failing(error: ApiError) -> Self {
        Self { page: Err(error), queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<ProductListQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductCatalogApi for FakeCatalog {
    async fn list_products(&self, query: &ProductListQuery) -> Result<ProductPage, ApiError> {
        self.queries.lock().unwrap().push(*query);
        self.page.clone()
    }
}

/// Keeps every export in memory and "writes" to the suggested name
#[derive(Default)]
pub struct RecordingSink {
    pub exports: Mutex<Vec<(String, Vec<ExportRow>)>>,
    pub product_exports: Mutex<Vec<(String, Vec<ListedProduct>)>>,
}

impl ExportSink for RecordingSink {
    fn export(&self, rows: &[ExportRow], suggested_name: &str) -> Result<PathBuf, ExportError> {
        self.exports.lock().unwrap().push((suggested_name.to_string(), rows.to_vec()));
        Ok(PathBuf::from(suggested_name))
    }

    fn export_products(
        &self,
        products: &[ListedProduct],
        suggested_name: &str,
    ) -> Result<PathBuf, ExportError> {
        self.product_exports
            .lock()
            .unwrap()
            .push((suggested_name.to_string(), products.to_vec()));
        Ok(PathBuf::from(suggested_name))
    }
}
