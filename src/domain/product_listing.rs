//! # Product Listing
//!
//! One page of the seller's SKC listing from the product page query, and its
//! flattening into export lines.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// `skcTopStatus` of SKCs currently on sale
pub const ON_SALE_STATUS: i32 = 100;

/// Body of the product page query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub page: u32,
    pub page_size: u32,
    pub skc_top_status: i32,
}

impl Default for ProductListQuery {
    /// First 100 on-sale SKCs
    fn default() -> Self {
        Self { page: 1, page_size: 100, skc_top_status: ON_SALE_STATUS }
    }
}

#[must_use]
pub const fn listing_status_label(skc_top_status: i32) -> &'static str {
    match skc_top_status {
        ON_SALE_STATUS => "在售",
        _ => "其他",
    }
}

/// Strings and numbers both become strings; empty strings count as absent.
fn optional_scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPageResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub result: Option<ProductPagePayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPagePayload {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub records: Option<Vec<ProductRecordPayload>>,
}

/// Listing records name the same field differently depending on the SKC type
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecordPayload {
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub product_id: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub product_skc_id: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub product_skc_name: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub ext_code: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub product_code: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub sale_price: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar_as_string")]
    pub price: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub total_stock: Option<i64>,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub create_time: Option<i64>,
}

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedProduct {
    pub product_id: String,
    pub product_name: Option<String>,
    pub ext_code: Option<String>,
    pub sale_price: Option<String>,
    pub stock: i64,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ListedProduct {
    /// Creation time in local time, `-` when unknown
    #[must_use]
    pub fn created_at_label(&self) -> String {
        self.created_at.map_or_else(
            || "-".to_string(),
            |at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        )
    }

    /// Export columns, in header order
    #[must_use]
    pub fn fields(&self) -> [String; 7] {
        [
            self.product_id.clone(),
            self.product_name.clone().unwrap_or_default(),
            self.ext_code.clone().unwrap_or_default(),
            self.sale_price.clone().unwrap_or_default(),
            self.stock.to_string(),
            self.status.clone(),
            self.created_at_label(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub records: Vec<ListedProduct>,
    /// Matching SKCs across all pages
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl ProductPage {
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(u64::from(self.page_size))
        }
    }
}

impl ProductRecordPayload {
    fn into_listed(self, status: &str) -> ListedProduct {
        ListedProduct {
            product_id: self.product_id.or(self.product_skc_id).unwrap_or_default(),
            product_name: self.product_name.or(self.product_skc_name),
            ext_code: self.ext_code.or(self.product_code),
            sale_price: self.sale_price.or(self.price),
            stock: self
                .stock
                .filter(|stock| *stock != 0)
                .or(self.total_stock)
                .unwrap_or(0),
            status: status.to_string(),
            created_at: self.create_time.and_then(DateTime::<Utc>::from_timestamp_millis),
        }
    }
}

impl ProductPagePayload {
    /// Missing paging fields fall back to what was asked for
    #[must_use]
    pub fn into_page(self, query: &ProductListQuery) -> ProductPage {
        let status = listing_status_label(query.skc_top_status);
        ProductPage {
            records: self
                .records
                .unwrap_or_default()
                .into_iter()
                .map(|record| record.into_listed(status))
                .collect(),
            total: self.total.unwrap_or(0),
            page: self.page.unwrap_or(query.page),
            page_size: self.page_size.unwrap_or(query.page_size),
        }
    }
}
