//! Infrastructure layer for configuration, logging and the seller portal
//!
//! Adapters behind the domain traits (`ActivityApi`, `ExportSink`) plus the
//! ambient setup every entry point needs.

pub mod config;  // Configuration file, layered overrides and defaults
pub mod logging;  // Logging infrastructure
pub mod session;  // Cookie credentials per site
pub mod portal_client;  // reqwest-based ActivityApi
pub mod csv_export;  // CSV ExportSink

// Re-export commonly used items
pub use config::{AppConfig, ConfigError, ConfigManager, SiteKind};
pub use logging::{get_log_directory, init_logging_with_config};
pub use session::{Cookie, SessionCredentials};
pub use portal_client::PortalActivityClient;
pub use csv_export::CsvExportSink;
