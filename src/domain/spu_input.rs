//! # SPU Input Parsing
//!
//! Turns the free-text SPU box into a deduplicated list of product ids plus a
//! structured error report. Parsing is lenient: malformed tokens never abort the
//! parse, they surface through [`ParsedInput::errors`].

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Product ids are 10-15 ASCII digits.
static SPU_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10,15}$").expect("SPU pattern is a valid regex"));

/// Why a token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpuErrorReason {
    /// Not 10-15 digits
    BadFormat,
    /// Valid format but already seen earlier in the input
    Duplicate,
}

impl SpuErrorReason {
    /// Message shown next to the input box
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::BadFormat => "SPU格式错误：应为10-15位数字",
            Self::Duplicate => "重复的SPU",
        }
    }
}

impl std::fmt::Display for SpuErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadFormat => write!(f, "bad format"),
            Self::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// One rejected token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpuInputError {
    /// 1-based position of the raw token after splitting
    pub position: usize,
    pub raw_value: String,
    pub reason: SpuErrorReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Raw tokens produced by the split, empty ones included
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub duplicates: usize,
}

/// Result of a single parse call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInput {
    pub ids: Vec<String>,
    pub errors: Vec<SpuInputError>,
    pub stats: ParseStats,
}

impl ParsedInput {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Short status line for the input box ("识别到 N 个有效SPU")
    #[must_use]
    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            format!("识别到 {} 个有效SPU", self.ids.len())
        } else {
            format!("识别到 {} 个有效SPU, {} 个错误", self.ids.len(), self.errors.len())
        }
    }
}

/// Delimiter chosen for a given input. Order of the variants is the detection priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpuDelimiter {
    Comma,
    Newline,
    Tab,
    Whitespace,
    None,
}

impl SpuDelimiter {
    /// First delimiter present in `text`, scanned comma > newline > tab > space.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        if text.contains(',') {
            Self::Comma
        } else if text.contains('\n') {
            Self::Newline
        } else if text.contains('\t') {
            Self::Tab
        } else if text.contains(' ') {
            Self::Whitespace
        } else {
            Self::None
        }
    }

    fn split(self, text: &str) -> Vec<&str> {
        match self {
            Self::Comma => text.split(',').collect(),
            Self::Newline => text.split('\n').collect(),
            Self::Tab => text.split('\t').collect(),
            Self::Whitespace => text.split_whitespace().collect(),
            Self::None => vec![text],
        }
    }
}

/// Returns true when `value` is a well-formed product id.
#[must_use]
pub fn is_valid_spu(value: &str) -> bool {
    SPU_PATTERN.is_match(value)
}

/// Parse user-entered SPU text.
#[must_use]
pub fn parse_spu_input(text: &str) -> ParsedInput {
    let mut parsed = ParsedInput::default();

    let clean = text.trim();
    if clean.is_empty() {
        return parsed;
    }

    let delimiter = SpuDelimiter::detect(clean);
    let mut seen: HashSet<&str> = HashSet::new();

    for (index, raw) in delimiter.split(clean).into_iter().enumerate() {
        parsed.stats.total += 1;

        let token = raw.trim();
        if token.is_empty() {
            continue;
        }

        if !is_valid_spu(token) {
            parsed.errors.push(SpuInputError {
                position: index + 1,
                raw_value: token.to_string(),
                reason: SpuErrorReason::BadFormat,
            });
            parsed.stats.invalid += 1;
            continue;
        }

        if !seen.insert(token) {
            parsed.errors.push(SpuInputError {
                position: index + 1,
                raw_value: token.to_string(),
                reason: SpuErrorReason::Duplicate,
            });
            parsed.stats.duplicates += 1;
            continue;
        }

        parsed.ids.push(token.to_string());
    }

    parsed.stats.valid = parsed.ids.len();
    parsed
}
