//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler:
//! - SQLite database initialization and schema management
//! - The URL frontier and its visited/scraped state machine
//! - The article table

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteArticles, SqliteFrontier};
pub use traits::{ArticleStore, FrontierStore, StorageError, StorageResult};

use crate::config::OutputConfig;
use crate::state::UrlState;
use std::path::Path;

/// Opens both stores named by the output configuration
///
/// A failure here is fatal to a crawl.
pub fn open_stores(config: &OutputConfig) -> StorageResult<(SqliteFrontier, SqliteArticles)> {
    let frontier = SqliteFrontier::open(Path::new(&config.urls_database_path))?;
    let articles = SqliteArticles::open(Path::new(&config.articles_database_path))?;
    Ok((frontier, articles))
}

/// Represents a URL in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: String,
    pub visited: bool,
    pub scraped: bool,
    /// Number of failed processing attempts
    pub attempts: u32,
}

impl UrlRecord {
    /// Returns the lifecycle state, or None if the flags are inconsistent
    pub fn state(&self) -> Option<UrlState> {
        UrlState::from_flags(self.visited, self.scraped)
    }
}

/// A structured article extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub date_published: String,
    pub content: String,
}
