//! Statistics generation from the crawl databases
//!
//! This module provides functionality for extracting and displaying
//! frontier and article counts from the storage layer.

use crate::state::UrlState;
use crate::storage::{ArticleStore, FrontierStore, StorageResult};

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Total number of URLs in the frontier
    pub total_urls: u64,

    /// URLs not yet claimed by any batch
    pub unvisited: u64,

    /// URLs claimed but never successfully scraped
    pub visited_unscraped: u64,

    /// URLs whose article was stored
    pub scraped: u64,

    /// URLs that failed at least twice
    pub attempted_more_than_once: u64,

    /// Rows in the article store
    pub articles: u64,
}

/// Loads statistics from both stores
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query a store
pub fn load_statistics(
    frontier: &dyn FrontierStore,
    articles: &dyn ArticleStore,
) -> StorageResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        total_urls: frontier.count_urls()?,
        unvisited: frontier.count_by_state(UrlState::Unvisited)?,
        visited_unscraped: frontier.count_by_state(UrlState::Visited)?,
        scraped: frontier.count_by_state(UrlState::Scraped)?,
        attempted_more_than_once: frontier.count_with_attempts(2)?,
        articles: articles.count_articles()?,
    })
}

fn percentage(count: u64, total: u64) -> f64 {
    if total > 0 {
        (count as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Frontier:");
    println!("  Total URLs: {}", stats.total_urls);
    for (state, count) in [
        (UrlState::Unvisited, stats.unvisited),
        (UrlState::Visited, stats.visited_unscraped),
        (UrlState::Scraped, stats.scraped),
    ] {
        println!(
            "  {}: {} ({:.1}%)",
            state,
            count,
            percentage(count, stats.total_urls)
        );
    }
    if stats.attempted_more_than_once > 0 {
        println!("  Failed more than once: {}", stats.attempted_more_than_once);
    }
    println!();

    println!("Articles stored: {}", stats.articles);

    let claimed = stats.visited_unscraped + stats.scraped;
    println!(
        "Success Rate: {:.1}% ({} / {} claimed URLs scraped)",
        percentage(stats.scraped, claimed),
        stats.scraped,
        claimed
    );
}
