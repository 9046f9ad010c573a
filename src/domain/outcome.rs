//! Batch progress and per-item cancellation outcomes

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelStatus {
    Success,
    Failed,
}

/// Final result of cancelling one enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub product_id: String,
    pub enroll_id: String,
    pub activity_name: String,
    pub status: CancelStatus,
    pub error: Option<String>,
    /// Attempts consumed beyond the first
    pub retries: u32,
}

impl CancelOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == CancelStatus::Success
    }
}

/// How a whole batch went; drives the message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSummary {
    AllSucceeded,
    AllFailed,
    Mixed,
}

impl BatchSummary {
    #[must_use]
    pub const fn from_counts(success_count: usize, failed_count: usize) -> Self {
        if failed_count == 0 {
            Self::AllSucceeded
        } else if success_count == 0 {
            Self::AllFailed
        } else {
            Self::Mixed
        }
    }

    #[must_use]
    pub fn message(self, success_count: usize, failed_count: usize) -> String {
        match self {
            Self::AllSucceeded => format!("批量取消完成！成功取消 {success_count} 个活动"),
            Self::AllFailed => format!("批量取消失败！所有 {failed_count} 个活动都取消失败"),
            Self::Mixed => {
                format!("批量取消完成！成功 {success_count} 个，失败 {failed_count} 个")
            }
        }
    }
}

/// Live counters of a running batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub current_label: String,
    pub results: Vec<CancelOutcome>,
}

impl BatchProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self { total, ..Self::default() }
    }

    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.completed.saturating_sub(self.failed)
    }

    /// Rounded completion percentage, 0 for an empty batch
    #[must_use]
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.completed.min(self.total) * 100 + self.total / 2) / self.total;
        u8::try_from(pct).unwrap_or(100)
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}
