//! Configuration infrastructure
//!
//! Contains configuration loading and management for the activity canceller.
//!
//! Two ways in:
//! 1. `ConfigManager` keeps a JSON file in the user config directory and creates
//!    a default one on first run.
//! 2. `AppConfig::load_layered` reads an explicit file (JSON or TOML) and applies
//!    `ACTCANCEL_*` environment overrides on top, e.g. `ACTCANCEL_BATCH__CONCURRENCY=5`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::domain::ReportLocale;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from file: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub api: ApiConfig,
    pub batch: BatchConfig,
    pub logging: LoggingConfig,
    pub export: ExportConfig,
}

/// Portal regions the tool can talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    #[default]
    Global,
    Us,
    Eu,
    SellerCenter,
}

impl SiteKind {
    /// Landing page of the region
    #[must_use]
    pub const fn home_url(self) -> &'static str {
        match self {
            Self::Global => portal::GLOBAL_URL,
            Self::Us => portal::US_URL,
            Self::Eu => portal::EU_URL,
            Self::SellerCenter => portal::SELLER_CENTER_URL,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Global => "全球",
            Self::Us => "美国",
            Self::Eu => "欧区",
            Self::SellerCenter => "卖家中心",
        }
    }
}

/// Selected site and the account on it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub kind: SiteKind,
    /// Overrides the region's origin, e.g. for a staging host
    pub base_url: Option<String>,
    /// Sent as the `mallid` header when set
    pub mall_id: Option<String>,
}

impl SiteConfig {
    /// Origin all API paths are appended to, without trailing slash
    pub fn base_url(&self) -> Result<String, ConfigError> {
        let raw = self.base_url.as_deref().unwrap_or_else(|| self.kind.home_url());
        let parsed = url::Url::parse(raw).map_err(|e| ConfigError::Validation {
            message: format!("invalid site url {raw}: {e}"),
        })?;
        Ok(parsed.origin().ascii_serialization())
    }
}

/// Remote endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub query_path: String,
    pub cancel_path: String,
    pub product_list_path: String,
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}

/// Batch workflow settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Parallel requests for both query and cancel phases
    pub concurrency: usize,
    /// Cancel attempts per enrollment, first one included
    pub max_cancel_attempts: u32,
    pub retry_delay_ms: u64,
    pub default_cancel_reason: String,
}

impl BatchConfig {
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,
    /// Offset of log timestamps from UTC
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Where CSV files go; the working directory when unset
    pub directory: Option<PathBuf>,
    pub locale: ReportLocale,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            query_path: defaults::QUERY_PATH.to_string(),
            cancel_path: defaults::CANCEL_PATH.to_string(),
            product_list_path: defaults::PRODUCT_LIST_PATH.to_string(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: defaults::CONCURRENCY,
            max_cancel_attempts: defaults::MAX_CANCEL_ATTEMPTS,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            default_cancel_reason: defaults::CANCEL_REASON.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            max_files: defaults::LOG_MAX_FILES,
            utc_offset_hours: defaults::LOG_UTC_OFFSET_HOURS,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { directory: None, locale: ReportLocale::Zh }
    }
}

impl AppConfig {
    /// File source plus `ACTCANCEL_` environment overrides, then validation
    pub fn load_layered(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("ACTCANCEL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch.concurrency == 0 {
            return Err(ConfigError::Validation {
                message: "batch.concurrency must be greater than 0".to_string(),
            });
        }
        if self.batch.max_cancel_attempts == 0 {
            return Err(ConfigError::Validation {
                message: "batch.max_cancel_attempts must be greater than 0".to_string(),
            });
        }
        if self.batch.default_cancel_reason.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "batch.default_cancel_reason must not be blank".to_string(),
            });
        }
        if self.api.request_timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "api.request_timeout_seconds must be greater than 0".to_string(),
            });
        }
        let paths = [
            ("query_path", &self.api.query_path),
            ("cancel_path", &self.api.cancel_path),
            ("product_list_path", &self.api.product_list_path),
        ];
        for (name, path) in paths {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation {
                    message: format!("api.{name} must start with '/', got {path:?}"),
                });
            }
        }
        if !(-12..=14).contains(&self.logging.utc_offset_hours) {
            return Err(ConfigError::Validation {
                message: format!("logging.utc_offset_hours out of range: {}", self.logging.utc_offset_hours),
            });
        }
        self.site.base_url()?;
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);
        Ok(config_dir)
    }

    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME);
        Ok(Self { config_path })
    }

    #[must_use]
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self { config_path: config_path.into() }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!("🎉 Configuration file not found, creating default: {:?}", self.config_path);
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;
        let config: AppConfig =
            serde_json::from_str(&content).context("Failed to parse configuration file")?;
        config.validate().context("Invalid configuration file")?;

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    pub async fn update_config<F>(&self, updater: F) -> Result<AppConfig>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.load_config().await?;
        updater(&mut config);
        config.validate().context("Updated configuration is invalid")?;
        self.save_config(&config).await?;
        Ok(config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Seller portal entry points
pub mod portal {
    pub const GLOBAL_URL: &str = "https://agentseller.temu.com/";
    pub const US_URL: &str = "https://agentseller-us.temu.com/";
    pub const EU_URL: &str = "https://agentseller-eu.temu.com/";
    pub const SELLER_CENTER_URL: &str = "https://seller.kuajingmaihuo.com/main";
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "activity-canceller";
    pub const CONFIG_FILE_NAME: &str = "activity_canceller_config.json";

    pub const QUERY_PATH: &str = "/bg/marketing/activity/enroll/query";
    pub const CANCEL_PATH: &str = "/bg/marketing/activity/enroll/cancel";
    pub const PRODUCT_LIST_PATH: &str = "/visage-agent-seller/product/skc/pageQuery";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/140.0.0.0 Safari/537.36";

    pub const CONCURRENCY: usize = 3;
    pub const MAX_CANCEL_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAY_MS: u64 = 1000;
    pub const CANCEL_REASON: &str = "申请退出";

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_MAX_FILES: u32 = 5;
    /// Portal operates on China Standard Time
    pub const LOG_UTC_OFFSET_HOURS: i32 = 8;
}
