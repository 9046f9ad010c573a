//! Product listing - fetch one page of on-sale SKCs and export it
//!
//! Independent of the batch session: it needs the same portal credentials but
//! none of the activity state.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use thiserror::Error;
use tracing::info;

use crate::domain::report::suggested_product_export_name;
use crate::domain::{
    ApiError, ExportError, ExportSink, ProductCatalogApi, ProductListQuery, ProductPage,
    ReportLocale,
};

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("没有可导出的商品数据")]
    NoProducts,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub struct ProductListing {
    api: Arc<dyn ProductCatalogApi>,
    sink: Arc<dyn ExportSink>,
    locale: ReportLocale,
    last_page: Option<ProductPage>,
}

impl ProductListing {
    pub fn new(api: Arc<dyn ProductCatalogApi>, sink: Arc<dyn ExportSink>, locale: ReportLocale) -> Self {
        Self { api, sink, locale, last_page: None }
    }

    /// Fetches a page and keeps it for `export`. A failed fetch keeps the previous page.
    pub async fn fetch(&mut self, query: ProductListQuery) -> Result<&ProductPage, ListingError> {
        info!(
            "📦 Fetching products (page {}, size {}, status {})",
            query.page, query.page_size, query.skc_top_status
        );
        let page = self.api.list_products(&query).await?;
        info!("✅ Fetched {} products ({} in total)", page.records.len(), page.total);
        Ok(self.last_page.insert(page))
    }

    #[must_use]
    pub const fn page(&self) -> Option<&ProductPage> {
        self.last_page.as_ref()
    }

    /// Writes the last fetched page through the export sink.
    pub fn export(&self) -> Result<PathBuf, ListingError> {
        let page = self
            .last_page
            .as_ref()
            .filter(|page| !page.records.is_empty())
            .ok_or(ListingError::NoProducts)?;
        let name = suggested_product_export_name(self.locale, &Local::now());
        Ok(self.sink.export_products(&page.records, &name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeCatalog, RecordingSink};
    use crate::domain::ListedProduct;

    fn listed(product_id: &str) -> ListedProduct {
        ListedProduct {
            product_id: product_id.to_string(),
            product_name: Some(format!("Product {product_id}")),
            ext_code: None,
            sale_price: Some("9.90".into()),
            stock: 3,
            status: "在售".into(),
            created_at: None,
        }
    }

    fn listing(catalog: FakeCatalog) -> (ProductListing, Arc<FakeCatalog>, Arc<RecordingSink>) {
        let catalog = Arc::new(catalog);
        let sink = Arc::new(RecordingSink::default());
        let listing = ProductListing::new(
            Arc::clone(&catalog) as Arc<dyn ProductCatalogApi>,
            Arc::clone(&sink) as Arc<dyn ExportSink>,
            ReportLocale::Zh,
        );
        (listing, catalog, sink)
    }

    #[tokio::test]
    async fn fetch_then_export_last_page() {
        let page = ProductPage { records: vec![listed("88001"), listed("88002")], total: 2, page: 1, page_size: 100 };
        let (mut listing, catalog, sink) = listing(FakeCatalog::serving(page));

        assert_eq!(listing.fetch(ProductListQuery::default()).await.unwrap().records.len(), 2);
        assert_eq!(catalog.queries(), vec![ProductListQuery::default()]);

        let path = listing.export().unwrap();
        let exports = sink.product_exports.lock().unwrap();
        assert_eq!(exports.len(), 1);
        assert_eq!(PathBuf::from(&exports[0].0), path);
        assert!(exports[0].0.starts_with("在售商品列表_"));
        assert_eq!(exports[0].1[1].product_id, "88002");
    }

    #[tokio::test]
    async fn nothing_to_export_before_fetch_or_on_empty_page() {
        let (mut listing, _, sink) = listing(FakeCatalog::serving(ProductPage::default()));
        assert!(matches!(listing.export(), Err(ListingError::NoProducts)));

        listing.fetch(ProductListQuery::default()).await.unwrap();
        assert!(matches!(listing.export(), Err(ListingError::NoProducts)));
        assert!(sink.product_exports.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn api_errors_propagate() {
        let (mut listing, _, _) = listing(FakeCatalog::failing(ApiError::NotAuthenticated));

        assert!(matches!(
            listing.fetch(ProductListQuery::default()).await,
            Err(ListingError::Api(ApiError::NotAuthenticated))
        ));
        assert!(listing.page().is_none());
    }
}
