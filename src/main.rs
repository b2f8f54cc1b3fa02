//! News-Harvest main entry point
//!
//! This is the command-line interface for the News-Harvest article crawler.

use anyhow::Context;
use clap::Parser;
use news_harvest::config::{load_config_with_hash, Config};
use news_harvest::crawler::crawl;
use news_harvest::output::{load_statistics, print_statistics};
use news_harvest::storage::open_stores;
use news_harvest::state::FailurePolicy;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// News-Harvest: a single-site article crawler
///
/// News-Harvest starts from a seed URL, stores the article found on every page
/// it visits, and follows same-site links until no unvisited URL is left. The
/// URL frontier is persistent, so an interrupted crawl picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "news-harvest")]
#[command(version)]
#[command(about = "A single-site article crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the databases and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_ref())?;

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("news_harvest=info,warn"),
            1 => EnvFilter::new("news_harvest=debug,info"),
            2 => EnvFilter::new("news_harvest=trace,debug"),
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

/// Loads the configuration file, or the validated defaults when none is given
fn load(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::info!("No configuration file given, using built-in defaults");
        let config = Config::default();
        config.validate()?;
        return Ok(config);
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== News-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed URL: {}", config.crawler.seed_url);
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!("  Workers: {}", config.crawler.worker_count);
    println!("  Poll interval: {}ms", config.crawler.poll_interval_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Resolve relative links: {}",
        config.crawler.resolve_relative_links
    );
    match config.crawler.max_batches {
        Some(max) => println!("  Max batches: {}", max),
        None => println!("  Max batches: unlimited"),
    }
    match config.crawler.failure_policy {
        FailurePolicy::Abandon => println!("  On failure: abandon"),
        FailurePolicy::Retry { max_attempts } => {
            println!("  On failure: retry (up to {} attempts)", max_attempts)
        }
    }

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nSelectors:");
    println!("  Story: {}", config.selectors.story);
    println!("  Title: {}", config.selectors.title);
    println!("  Content: {}", config.selectors.content);
    println!("  Date published: {}", config.selectors.date_published);
    println!("  Links: {}", config.selectors.link);

    println!("\nOutput:");
    println!("  URL database: {}", config.output.urls_database_path);
    println!("  Article database: {}", config.output.articles_database_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the databases
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("URL database: {}", config.output.urls_database_path);
    println!("Article database: {}\n", config.output.articles_database_path);

    let (frontier, articles) = open_stores(&config.output)?;
    let stats = load_statistics(&frontier, &articles)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Starting crawl of {} from {} ({} workers, batches of {})",
        config.crawler.base_url,
        config.crawler.seed_url,
        config.crawler.worker_count,
        config.crawler.batch_size
    );

    tokio::select! {
        result = crawl(config) => {
            let report = result.context("crawl failed")?;
            if report.exhausted {
                tracing::info!("Frontier exhausted, crawl complete");
            } else {
                tracing::info!("Crawl stopped with unvisited URLs remaining");
            }
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, in-flight URLs stay claimed");
            Ok(())
        }
    }
}
