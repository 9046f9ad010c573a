//! Activity Canceller CLI
//!
//! ## Commands
//!
//! - `parse`: validate a list of product ids (SPUs) without touching the network
//! - `query`: list the activity enrollments of every id, grouped by activity
//! - `cancel`: withdraw the enrollments of the chosen activities and export a CSV report
//! - `products`: list on-sale products and export them as CSV

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use activity_canceller_lib::application::{
    BatchSession, ListingError, ProductListing, ProgressReceiver, RetryPolicy, SessionSettings,
};
use activity_canceller_lib::domain::{
    ActivityGroups, ParsedInput, ProductListQuery, ProductPage, parse_spu_input,
};
use activity_canceller_lib::infrastructure::{
    AppConfig, ConfigManager, CsvExportSink, PortalActivityClient, SessionCredentials, SiteKind,
    init_logging_with_config, logging::log_system_info,
};

#[derive(Parser)]
#[command(name = "activity-canceller")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Batch cancellation of seller-portal activity enrollments", long_about = None)]
struct Cli {
    /// Config file (JSON or TOML); the per-user config is used when omitted
    #[arg(short, long, global = true, env = "ACTCANCEL_CONFIG")]
    config: Option<PathBuf>,

    /// Portal region, overrides the config file
    #[arg(long, global = true, value_enum)]
    site: Option<SiteArg>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines to the log file
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SiteArg {
    Global,
    Us,
    Eu,
    SellerCenter,
}

impl From<SiteArg> for SiteKind {
    fn from(arg: SiteArg) -> Self {
        match arg {
            SiteArg::Global => Self::Global,
            SiteArg::Us => Self::Us,
            SiteArg::Eu => Self::Eu,
            SiteArg::SellerCenter => Self::SellerCenter,
        }
    }
}

/// Where the product ids come from
#[derive(clap::Args)]
struct IdInput {
    /// Product ids separated by commas, newlines, tabs or spaces
    ids: Option<String>,

    /// Read product ids from a file instead
    #[arg(short, long, conflicts_with = "ids")]
    file: Option<PathBuf>,
}

impl IdInput {
    async fn read(&self) -> Result<String> {
        match (&self.ids, &self.file) {
            (Some(ids), _) => Ok(ids.clone()),
            (None, Some(path)) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read id file {}", path.display())),
            (None, None) => bail!("Provide product ids or --file"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate product ids and show what would be queried
    Parse {
        #[command(flatten)]
        input: IdInput,
    },

    /// Query activity enrollments and print them grouped by activity
    Query {
        #[command(flatten)]
        input: IdInput,

        /// Cookie dump exported from a logged-in browser session (JSON)
        #[arg(long)]
        cookies: PathBuf,
    },

    /// Cancel enrollments of the chosen activities
    Cancel {
        #[command(flatten)]
        input: IdInput,

        #[arg(long)]
        cookies: PathBuf,

        /// Activity names to cancel (repeatable)
        #[arg(short, long = "activity", required_unless_present = "all")]
        activities: Vec<String>,

        /// Cancel every enrollment found
        #[arg(long)]
        all: bool,

        /// Cancel reason sent to the portal
        #[arg(short, long)]
        reason: Option<String>,

        /// Directory for the CSV report, overrides the config file
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Skip writing the CSV report
        #[arg(long)]
        no_export: bool,
    },

    /// List on-sale products and export them
    Products {
        #[arg(long)]
        cookies: PathBuf,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 100)]
        page_size: u32,

        /// Directory for the CSV file, overrides the config file
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Only print the products
        #[arg(long)]
        no_export: bool,
    },
}

async fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_layered(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ConfigManager::new()?.load_config().await?,
    };

    if let Some(site) = cli.site {
        config.site.kind = site.into();
    }
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json {
        config.logging.json_format = true;
    }
    Ok(config)
}

fn session_settings(config: &AppConfig) -> SessionSettings {
    SessionSettings {
        concurrency: config.batch.concurrency,
        retry: RetryPolicy {
            max_attempts: config.batch.max_cancel_attempts,
            delay: config.batch.retry_delay(),
        },
        locale: config.export.locale,
        default_reason: config.batch.default_cancel_reason.clone(),
    }
}

async fn open_portal(
    config: &AppConfig,
    cookies: &Path,
    export_dir: Option<PathBuf>,
) -> Result<(PortalActivityClient, CsvExportSink)> {
    let credentials = SessionCredentials::load(cookies).await?;
    if !credentials.has_login_cookie() {
        warn!("⚠️ No login cookie found in {}, requests will probably be rejected", cookies.display());
    }
    info!("🌍 Site: {}", config.site.kind.display_name());

    let api = PortalActivityClient::new(&config.site, &config.api, &credentials)?;
    let directory = export_dir
        .or_else(|| config.export.directory.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    Ok((api, CsvExportSink::new(directory, config.export.locale)))
}

async fn open_session(config: &AppConfig, cookies: &Path, export_dir: Option<PathBuf>) -> Result<BatchSession> {
    let (api, sink) = open_portal(config, cookies, export_dir).await?;
    Ok(BatchSession::new(Arc::new(api), Arc::new(sink), session_settings(config))?)
}

fn spawn_progress_logger(mut rx: ProgressReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let progress = rx.borrow_and_update().clone();
            if progress.total > 0 && progress.completed > 0 {
                info!(
                    "📈 {}% ({}/{}, {} failed) {}",
                    progress.percentage(),
                    progress.completed,
                    progress.total,
                    progress.failed,
                    progress.current_label
                );
            }
        }
    })
}

fn print_parse_report(parsed: &ParsedInput) {
    println!("{}", parsed.summary());
    println!(
        "total: {}, valid: {}, invalid: {}, duplicates: {}",
        parsed.stats.total, parsed.stats.valid, parsed.stats.invalid, parsed.stats.duplicates
    );
    for error in &parsed.errors {
        println!("  #{} {:?}: {}", error.position, error.raw_value, error.reason.message());
    }
}

fn print_groups(groups: &ActivityGroups) {
    for group in groups {
        println!(
            "{} [{}] - {} products, {} enrollments",
            group.activity_name,
            group.type_label(),
            group.product_count,
            group.total_enrollments
        );
        for item in &group.items {
            let enrollment = &item.enrollment;
            println!(
                "    {}  enroll {}  {}  stock {}  active sites {}",
                enrollment.product_id,
                enrollment.enroll_id,
                enrollment.price_range_label(),
                enrollment.stock,
                enrollment.active_site_count()
            );
        }
    }
}

fn print_products(page: &ProductPage) {
    println!(
        "{} products on page {}/{} ({} in total)",
        page.records.len(),
        page.page,
        page.total_pages(),
        page.total
    );
    for product in &page.records {
        println!(
            "    {}  {}  {}  price {}  stock {}  {}",
            product.product_id,
            product.product_name.as_deref().unwrap_or("-"),
            product.ext_code.as_deref().unwrap_or("-"),
            product.sale_price.as_deref().unwrap_or("-"),
            product.stock,
            product.created_at_label()
        );
    }
}

async fn query_into(session: &mut BatchSession, input: &IdInput) -> Result<()> {
    let text = input.read().await?;
    let parsed = session.parse_input(&text);
    print_parse_report(parsed);

    let progress = spawn_progress_logger(session.subscribe_progress());
    let result = session.query_parsed().await;
    progress.abort();
    result?;

    for failure in session.query_failures() {
        println!("✗ {}: {}", failure.product_id, failure.error);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli).await?;
    init_logging_with_config(config.logging.clone())?;
    log_system_info();

    match cli.command {
        Commands::Parse { input } => {
            let parsed = parse_spu_input(&input.read().await?);
            print_parse_report(&parsed);
            for id in &parsed.ids {
                println!("{id}");
            }
        }

        Commands::Query { input, cookies } => {
            let mut session = open_session(&config, &cookies, None).await?;
            query_into(&mut session, &input).await?;
            print_groups(session.groups());
        }

        Commands::Cancel { input, cookies, activities, all, reason, export_dir, no_export } => {
            let mut session = open_session(&config, &cookies, export_dir).await?;
            query_into(&mut session, &input).await?;

            if all {
                session.groups_mut().select_all();
            } else {
                for name in &activities {
                    if !session.groups_mut().set_group_selected(name, true) {
                        warn!("⚠️ No enrollments found for activity {:?}", name);
                    }
                }
            }
            let summary = session.groups().selection_summary();
            println!("Selected {} enrollments in {} activities", summary.items, summary.groups);

            if let Some(reason) = reason {
                session.set_cancel_reason(reason);
            }

            let progress = spawn_progress_logger(session.subscribe_progress());
            let report = session.cancel_selected().await;
            progress.abort();
            let report = report?;

            println!("{}", report.message());
            for outcome in report.outcomes.iter().filter(|o| !o.is_success()) {
                println!(
                    "✗ {} {} ({}): {}",
                    outcome.product_id,
                    outcome.activity_name,
                    outcome.enroll_id,
                    outcome.error.as_deref().unwrap_or_default()
                );
            }

            if !no_export {
                let path = session.export_results()?;
                println!("Report written to {}", path.display());
            }
        }

        Commands::Products { cookies, page, page_size, export_dir, no_export } => {
            let (api, sink) = open_portal(&config, &cookies, export_dir).await?;
            let mut listing = ProductListing::new(Arc::new(api), Arc::new(sink), config.export.locale);

            let query = ProductListQuery { page, page_size, ..ProductListQuery::default() };
            print_products(listing.fetch(query).await?);

            if !no_export {
                match listing.export() {
                    Ok(path) => println!("Products written to {}", path.display()),
                    Err(ListingError::NoProducts) => println!("No products to export"),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(())
}
