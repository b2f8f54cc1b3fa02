//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching
//! - Article and link extraction
//! - Batch claiming and the bounded worker pool

mod coordinator;
mod extractor;
mod fetcher;
mod parser;

pub use coordinator::{CrawlReport, Crawler, TaskOutcome, TaskStage};
pub use extractor::Extractor;
pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use parser::{parse_page, LinkFilter, PageSelectors, ParsedPage};

use crate::config::Config;
use crate::HarvestError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open (or create) the URL and article databases
/// 2. Seed the frontier and extract the seed page
/// 3. Drain the frontier batch by batch until no unvisited URL is left
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran to completion
/// * `Err(HarvestError)` - A store could not be opened or seeded
pub async fn crawl(config: Config) -> Result<CrawlReport, HarvestError> {
    Crawler::open(&config)?.run().await
}
