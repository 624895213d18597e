//! Forum-Harvest main entry point
//!
//! This is the command-line interface for the Forum-Harvest crawler.

use anyhow::Context;
use chrono::NaiveDate;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use forum_harvest::config::{load_config_with_hash, Config};
use forum_harvest::crawler::{run_activity_sync, run_topic_crawl};
use forum_harvest::output::{load_summary, print_summary};
use forum_harvest::pidfile::PidGuard;
use forum_harvest::storage::{open_store, ActivityFilter};
use forum_harvest::{DateRange, HarvestError, ModScope};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Forum-Harvest: an authenticated forum crawler
///
/// Forum-Harvest logs into a forum, lists its topics per subforum, and keeps
/// a SQLite record of the moderator activity log.
#[derive(Parser, Debug)]
#[command(name = "forum-harvest")]
#[command(version = "1.0.0")]
#[command(about = "An authenticated forum crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG", default_value = "forum-harvest.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the forum tree, write per-subforum topic files and archive them
    Topics,

    /// Scrape the moderator activity log for a date window into the database
    Activity {
        /// First day of the window (YYYY-MM-DD)
        #[arg(long = "start_date", value_name = "DATE")]
        start_date: NaiveDate,

        /// Last day of the window, inclusive (YYYY-MM-DD)
        #[arg(long = "end_date", value_name = "DATE")]
        end_date: NaiveDate,

        /// Keep only current moderators ("active") or everyone ("all")
        #[arg(long = "mods_scope", value_name = "SCOPE", default_value = "active")]
        mods_scope: ModScope,
    },

    /// Print an activity summary from the database
    Stats {
        /// First day to include (YYYY-MM-DD)
        #[arg(long = "start_date", value_name = "DATE", requires = "end_date")]
        start_date: Option<NaiveDate>,

        /// Last day to include (YYYY-MM-DD)
        #[arg(long = "end_date", value_name = "DATE", requires = "start_date")]
        end_date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("forum_harvest=info,warn"),
            1 => EnvFilter::new("forum_harvest=debug,info"),
            2 => EnvFilter::new("forum_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match cli.command {
        Command::Topics => handle_topics(config).await,
        Command::Activity {
            start_date,
            end_date,
            mods_scope,
        } => handle_activity(&config, start_date, end_date, mods_scope).await,
        Command::Stats {
            start_date,
            end_date,
        } => handle_stats(&config, start_date.zip(end_date)),
    }
}

fn date_range(start: NaiveDate, end: NaiveDate) -> Result<DateRange, HarvestError> {
    DateRange::new(start, end).ok_or(HarvestError::InvalidRange { start, end })
}

/// Handles the `topics` command: forum-tree crawl and archive
async fn handle_topics(config: Config) -> anyhow::Result<()> {
    let _guard = PidGuard::acquire(&config.topics.pid_file)?;

    let summary = run_topic_crawl(Arc::new(config))
        .await
        .context("Topic crawl failed")?;

    println!("=== Topic Crawl ===\n");
    println!("  Subforums: {}", summary.subforums);
    println!("  Topics collected: {}", summary.topics);
    println!("  Files written: {}", summary.files.len());
    println!("  Archive: {}", summary.archive.display());

    Ok(())
}

/// Handles the `activity` command: reconcile, crawl and upsert
async fn handle_activity(
    config: &Config,
    start: NaiveDate,
    end: NaiveDate,
    scope: ModScope,
) -> anyhow::Result<()> {
    let requested = date_range(start, end)?;
    let _guard = PidGuard::acquire(&config.activity.pid_file)?;

    let mut store = open_store(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open database {}", config.storage.database_path))?;

    let summary = run_activity_sync(config, requested, scope, &mut store)
        .await
        .context("Activity sync failed")?;

    println!("=== Activity Sync: {} ({}) ===\n", requested, scope);
    if summary.missing.is_empty() {
        println!("  Already stored, nothing crawled");
    } else {
        for range in &summary.missing {
            println!("  Crawled: {}", range);
        }
        println!("  Rows scraped: {}", summary.scraped);
        println!("  Rows in scope: {}", summary.kept);
        println!("  New rows: {}", summary.inserted);
        println!("  Already stored: {}", summary.duplicates());
    }

    Ok(())
}

/// Handles the `stats` command: summary of stored activity
fn handle_stats(config: &Config, window: Option<(NaiveDate, NaiveDate)>) -> anyhow::Result<()> {
    let store = open_store(Path::new(&config.storage.database_path))
        .with_context(|| format!("Failed to open database {}", config.storage.database_path))?;

    let (filter, title) = match window {
        Some((start, end)) => {
            let range = date_range(start, end)?;
            (ActivityFilter::within(range), range.to_string())
        }
        None => (ActivityFilter::default(), "all time".to_string()),
    };

    println!("Database: {}\n", config.storage.database_path);
    let summary = load_summary(&store, &filter)?;
    print_summary(&summary, &title);

    Ok(())
}
