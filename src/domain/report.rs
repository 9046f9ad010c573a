//! # Result Reporting
//!
//! Flattens final cancel outcomes into export rows. Pure formatting only.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use super::outcome::{CancelOutcome, CancelStatus};

/// Language of status labels and export headers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLocale {
    #[default]
    Zh,
    En,
}

impl ReportLocale {
    #[must_use]
    pub const fn status_label(self, status: CancelStatus) -> &'static str {
        match (self, status) {
            (Self::Zh, CancelStatus::Success) => "成功",
            (Self::Zh, CancelStatus::Failed) => "失败",
            (Self::En, CancelStatus::Success) => "success",
            (Self::En, CancelStatus::Failed) => "failed",
        }
    }

    #[must_use]
    pub const fn headers(self) -> [&'static str; 6] {
        match self {
            Self::Zh => ["商品SPU", "活动名称", "报名ID", "操作状态", "错误信息", "重试次数"],
            Self::En => ["Product SPU", "Activity", "Enroll ID", "Status", "Error", "Retries"],
        }
    }

    #[must_use]
    pub const fn file_prefix(self) -> &'static str {
        match self {
            Self::Zh => "批量取消活动结果",
            Self::En => "batch_cancel_results",
        }
    }

    /// Columns of the product listing export
    #[must_use]
    pub const fn product_headers(self) -> [&'static str; 7] {
        match self {
            Self::Zh => ["商品ID", "商品名称", "商品编码", "售价(元)", "库存", "状态", "创建时间"],
            Self::En => ["Product ID", "Product Name", "SKU Code", "Sale Price", "Stock", "Status", "Created At"],
        }
    }

    #[must_use]
    pub const fn product_file_prefix(self) -> &'static str {
        match self {
            Self::Zh => "在售商品列表",
            Self::En => "on_sale_products",
        }
    }
}

/// One export line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub product_id: String,
    pub activity_name: String,
    pub enroll_id: String,
    pub status: String,
    /// Empty on success
    pub error: String,
    pub retries: u32,
}

impl ExportRow {
    #[must_use]
    pub fn fields(&self) -> [String; 6] {
        [
            self.product_id.clone(),
            self.activity_name.clone(),
            self.enroll_id.clone(),
            self.status.clone(),
            self.error.clone(),
            self.retries.to_string(),
        ]
    }
}

/// One row per outcome, same order.
#[must_use]
pub fn to_rows(outcomes: &[CancelOutcome], locale: ReportLocale) -> Vec<ExportRow> {
    outcomes
        .iter()
        .map(|outcome| ExportRow {
            product_id: outcome.product_id.clone(),
            activity_name: outcome.activity_name.clone(),
            enroll_id: outcome.enroll_id.clone(),
            status: locale.status_label(outcome.status).to_string(),
            error: match outcome.status {
                CancelStatus::Success => String::new(),
                CancelStatus::Failed => outcome.error.clone().unwrap_or_default(),
            },
            retries: outcome.retries,
        })
        .collect()
}

/// `<prefix>_2025-01-31T09-15-00.csv`
#[must_use]
pub fn suggested_export_name<Tz>(locale: ReportLocale, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.csv", locale.file_prefix(), at.format("%Y-%m-%dT%H-%M-%S"))
}

/// `<prefix>_20250131.csv`, one listing file per day
#[must_use]
pub fn suggested_product_export_name<Tz>(locale: ReportLocale, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}_{}.csv", locale.product_file_prefix(), at.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn outcome(status: CancelStatus, error: Option<&str>, retries: u32) -> CancelOutcome {
        CancelOutcome {
            product_id: "1234567890".into(),
            enroll_id: "e1".into(),
            activity_name: "Flash Sale".into(),
            status,
            error: error.map(str::to_string),
            retries,
        }
    }

    #[test]
    fn rows_carry_labels_errors_and_retries() {
        let outcomes = vec![
            outcome(CancelStatus::Success, None, 1),
            outcome(CancelStatus::Failed, Some("timeout"), 2),
        ];

        let rows = to_rows(&outcomes, ReportLocale::Zh);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].status, "成功");
        assert_eq!(rows[0].error, "");
        assert_eq!(rows[0].retries, 1);
        assert_eq!(rows[1].status, "失败");
        assert_eq!(rows[1].error, "timeout");
        assert_eq!(rows[1].fields()[5], "2");

        let rows = to_rows(&outcomes, ReportLocale::En);
        assert_eq!(rows[1].status, "failed");
    }

    #[test]
    fn success_rows_hide_stale_errors() {
        let rows = to_rows(&[outcome(CancelStatus::Success, Some("ignored"), 2)], ReportLocale::En);
        assert!(rows[0].error.is_empty());
    }

    #[test]
    fn export_name_has_no_colons() {
        let at = Utc.with_ymd_and_hms(2025, 1, 31, 9, 15, 0).unwrap();
        assert_eq!(
            suggested_export_name(ReportLocale::Zh, &at),
            "批量取消活动结果_2025-01-31T09-15-00.csv"
        );
        assert_eq!(suggested_product_export_name(ReportLocale::Zh, &at), "在售商品列表_20250131.csv");
        assert_eq!(ReportLocale::En.product_headers().len(), ReportLocale::Zh.product_headers().len());
    }
}
