//! Storage traits and error types
//!
//! This module defines the interfaces of the two persistent stores the crawler
//! owns: the URL frontier and the article table.

use crate::state::{FailureDisposition, FailurePolicy, UrlState};
use crate::storage::{Article, UrlRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to open store at {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Corrupt record for {url}: {reason}")]
    CorruptRecord { url: String, reason: String },

    #[error("Store call did not complete: {0}")]
    Interrupted(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The persistent set of discovered URLs and their crawl state
///
/// Multi-row mutations are all-or-nothing: if any row fails, no row changes.
pub trait FrontierStore {
    // ===== Crawl Operations =====

    /// Inserts the root URL as unvisited, but only if the store is empty
    ///
    /// Returns true if the URL was inserted.
    fn seed(&mut self, url: &str) -> StorageResult<bool>;

    /// Returns up to `limit` unvisited URLs in storage order
    ///
    /// An empty result means the frontier is exhausted.
    fn next_batch(&self, limit: usize) -> StorageResult<Vec<String>>;

    /// Marks every URL in the batch visited, in a single transaction
    fn mark_visited(&mut self, urls: &[String]) -> StorageResult<()>;

    /// Inserts each URL as unvisited unless it is already present, in a single transaction
    ///
    /// Returns how many rows were actually created.
    fn insert_if_absent(&mut self, urls: &[String]) -> StorageResult<usize>;

    /// Marks one URL scraped (which also implies visited)
    fn mark_scraped(&mut self, url: &str) -> StorageResult<()>;

    /// Counts a failed attempt against a URL and applies the failure policy
    ///
    /// A scraped URL is never returned to the frontier.
    fn record_failure(
        &mut self,
        url: &str,
        policy: FailurePolicy,
    ) -> StorageResult<FailureDisposition>;

    /// Returns URLs a previous run claimed but never finished to the frontier
    ///
    /// Only the retry policy reclaims them, and only while their attempts are
    /// below the limit. Returns how many URLs were reclaimed.
    fn reclaim_unfinished(&mut self, policy: FailurePolicy) -> StorageResult<usize>;

    // ===== Inspection =====

    /// Gets a URL record
    fn get_url(&self, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Gets the total number of URLs in the frontier
    fn count_urls(&self) -> StorageResult<u64>;

    /// Counts URLs in a given state
    fn count_by_state(&self, state: UrlState) -> StorageResult<u64>;

    /// Counts URLs that have failed at least `min_attempts` times
    fn count_with_attempts(&self, min_attempts: u32) -> StorageResult<u64>;

    /// Counts rows that are scraped but not visited (always 0 for a healthy store)
    fn count_inconsistent(&self) -> StorageResult<u64>;
}

/// The persistent table of extracted articles
pub trait ArticleStore {
    /// Inserts an article keyed by URL
    ///
    /// An existing article for the URL is left untouched; this is not an error.
    /// Returns true if the article was inserted.
    fn insert_if_absent(&mut self, article: &Article) -> StorageResult<bool>;

    /// Gets the article stored for a URL
    fn get_article(&self, url: &str) -> StorageResult<Option<Article>>;

    /// Gets the total number of stored articles
    fn count_articles(&self) -> StorageResult<u64>;
}
