//! # Promotional Activity Model
//!
//! Wire payloads returned by the portal's activity query endpoint and the
//! read-only domain types they are converted into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Portal ids arrive either as JSON strings or JSON numbers.
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Unsigned(n) => n.to_string(),
        RawId::Signed(n) => n.to_string(),
    })
}

fn optional_id_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "id_as_string")] String);

    Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// Envelope of the activity query endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQueryResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub result: Option<ProductActivityPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductActivityPayload {
    #[serde(default, deserialize_with = "optional_id_as_string")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub activity_list: Option<Vec<ActivityPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPayload {
    pub activity_name: String,
    #[serde(default)]
    pub activity_type: i32,
    #[serde(default)]
    pub feedback_enroll_info_list: Option<Vec<EnrollInfoPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollInfoPayload {
    #[serde(deserialize_with = "id_as_string")]
    pub enroll_id: String,
    #[serde(default)]
    pub min_activity_price: i64,
    #[serde(default)]
    pub max_activity_price: i64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub enroll_time: Option<i64>,
    #[serde(default)]
    pub enroll_sessions: Option<Vec<EnrollSessionPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollSessionPayload {
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub session_status: i32,
    #[serde(default)]
    pub start_date_str: String,
    #[serde(default)]
    pub end_date_str: String,
}

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// Status of one site session of an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Active,
    Ended,
    Completed,
    Unknown,
}

impl SessionStatus {
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Pending,
            2 => Self::Active,
            3 => Self::Ended,
            4 => Self::Completed,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "待开始",
            Self::Active => "进行中",
            Self::Ended => "已结束",
            Self::Completed => "已完成",
            Self::Unknown => "未知",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSession {
    pub site_name: String,
    pub status: SessionStatus,
    pub start_date: String,
    pub end_date: String,
}

/// Human label for a portal activity type code
#[must_use]
pub const fn activity_type_label(activity_type: i32) -> &'static str {
    match activity_type {
        1 => "限时秒杀",
        5 => "官方大促",
        27 => "清仓甩卖",
        _ => "其他活动",
    }
}

/// Formats an amount in minor currency units as `¥12.34`.
#[must_use]
pub fn format_price_minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}¥{}.{:02}", abs / 100, abs % 100)
}

/// One (product, activity, enrollment) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEnrollment {
    pub product_id: String,
    pub enroll_id: String,
    pub activity_name: String,
    pub activity_type: i32,
    /// (min, max) in minor currency units
    pub price_range_minor: (i64, i64),
    pub stock: i64,
    /// Milliseconds since the epoch
    pub enroll_timestamp: Option<i64>,
    pub site_sessions: Vec<SiteSession>,
}

impl ActivityEnrollment {
    #[must_use]
    pub fn enrolled_at(&self) -> Option<DateTime<Utc>> {
        self.enroll_timestamp.and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// Number of site sessions currently running
    #[must_use]
    pub fn active_site_count(&self) -> usize {
        self.site_sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Active)
            .count()
    }

    #[must_use]
    pub fn price_range_label(&self) -> String {
        format!(
            "{} ~ {}",
            format_price_minor(self.price_range_minor.0),
            format_price_minor(self.price_range_minor.1)
        )
    }
}

/// All enrollments of one product in one named activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivity {
    pub activity_name: String,
    pub activity_type: i32,
    pub enrollments: Vec<ActivityEnrollment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub product_id: String,
    pub product_name: Option<String>,
    pub image_url: Option<String>,
}

impl ProductInfo {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or("未知商品")
    }
}

/// Parsed answer of a single activity query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductActivityResult {
    pub info: ProductInfo,
    pub activities: Vec<ProductActivity>,
}

impl ProductActivityResult {
    #[must_use]
    pub fn enrollment_count(&self) -> usize {
        self.activities.iter().map(|a| a.enrollments.len()).sum()
    }
}

impl ProductActivityPayload {
    /// Converts the wire payload; `requested_id` is stamped on every enrollment so
    /// results stay keyed by the SPU the user typed.
    #[must_use]
    pub fn into_result(self, requested_id: &str) -> ProductActivityResult {
        let activities = self
            .activity_list
            .unwrap_or_default()
            .into_iter()
            .map(|activity| {
                let enrollments = activity
                    .feedback_enroll_info_list
                    .unwrap_or_default()
                    .into_iter()
                    .map(|enroll| ActivityEnrollment {
                        product_id: requested_id.to_string(),
                        enroll_id: enroll.enroll_id,
                        activity_name: activity.activity_name.clone(),
                        activity_type: activity.activity_type,
                        price_range_minor: (enroll.min_activity_price, enroll.max_activity_price),
                        stock: enroll.stock,
                        enroll_timestamp: enroll.enroll_time,
                        site_sessions: enroll
                            .enroll_sessions
                            .unwrap_or_default()
                            .into_iter()
                            .map(|s| SiteSession {
                                site_name: s.site_name,
                                status: SessionStatus::from_code(s.session_status),
                                start_date: s.start_date_str,
                                end_date: s.end_date_str,
                            })
                            .collect(),
                    })
                    .collect();

                ProductActivity {
                    activity_name: activity.activity_name,
                    activity_type: activity.activity_type,
                    enrollments,
                }
            })
            .collect();

        ProductActivityResult {
            info: ProductInfo {
                product_id: self.product_id.unwrap_or_else(|| requested_id.to_string()),
                product_name: self.product_name,
                image_url: self.image_url,
            },
            activities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "success": true,
        "result": {
            "productId": 1234567890,
            "productName": "Desk Lamp",
            "imageUrl": "https://img.example/lamp.png",
            "activityList": [
                {
                    "activityName": "Flash Sale",
                    "activityType": 1,
                    "feedbackEnrollInfoList": [
                        {
                            "enrollId": 998877,
                            "minActivityPrice": 1299,
                            "maxActivityPrice": 1599,
                            "stock": 40,
                            "enrollTime": 1735689600000,
                            "enrollSessions": [
                                {"siteName": "US", "sessionStatus": 2, "startDateStr": "2025-01-01", "endDateStr": "2025-01-07"},
                                {"siteName": "DE", "sessionStatus": 1, "startDateStr": "2025-01-08", "endDateStr": "2025-01-14"}
                            ]
                        }
                    ]
                },
                { "activityName": "Clearance", "activityType": 27, "feedbackEnrollInfoList": null }
            ]
        }
    }"#;

    #[test]
    fn payload_converts_into_domain_result() {
        let response: ActivityQueryResponse = serde_json::from_str(SAMPLE).unwrap();
        let result = response.result.unwrap().into_result("1234567890");

        assert_eq!(result.info.product_id, "1234567890");
        assert_eq!(result.info.display_name(), "Desk Lamp");
        assert_eq!(result.activities.len(), 2);
        assert_eq!(result.enrollment_count(), 1);

        let enrollment = &result.activities[0].enrollments[0];
        assert_eq!(enrollment.enroll_id, "998877");
        assert_eq!(enrollment.price_range_minor, (1299, 1599));
        assert_eq!(enrollment.price_range_label(), "¥12.99 ~ ¥15.99");
        assert_eq!(enrollment.active_site_count(), 1);
        assert_eq!(enrollment.site_sessions[1].status, SessionStatus::Pending);
        assert!(enrollment.enrolled_at().is_some());
        assert!(result.activities[1].enrollments.is_empty());
    }

    #[test]
    fn missing_result_is_none() {
        let response: ActivityQueryResponse =
            serde_json::from_str(r#"{"success": false, "errorMsg": "no such product"}"#).unwrap();
        assert!(response.result.is_none());
        assert_eq!(response.error_msg.as_deref(), Some("no such product"));
    }

    #[test]
    fn labels() {
        assert_eq!(activity_type_label(5), "官方大促");
        assert_eq!(activity_type_label(99), "其他活动");
        assert_eq!(SessionStatus::from_code(4).label(), "已完成");
        assert_eq!(SessionStatus::from_code(0), SessionStatus::Unknown);
        assert_eq!(format_price_minor(5), "¥0.05");
        assert_eq!(format_price_minor(-250), "-¥2.50");
    }
}
