//! SQLite storage implementation
//!
//! This module provides SQLite-backed implementations of the frontier and
//! article stores. Each store owns its own connection and database file.

use crate::state::{FailureDisposition, FailurePolicy, UrlState};
use crate::storage::schema::{initialize_articles_schema, initialize_urls_schema};
use crate::storage::traits::{ArticleStore, FrontierStore, StorageError, StorageResult};
use crate::storage::{Article, UrlRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

type SchemaInit = fn(&Connection) -> Result<(), rusqlite::Error>;

/// Opens a database file, configures it and applies its schema
fn open_connection(path: &Path, init: SchemaInit) -> StorageResult<Connection> {
    let open = || -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(Duration::from_secs(5))?;

        init(&conn)?;
        Ok(conn)
    };

    open().map_err(|source| StorageError::Open {
        path: path.display().to_string(),
        source,
    })
}

fn open_in_memory_connection(init: SchemaInit) -> StorageResult<Connection> {
    let open = || -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(conn)
    };

    open().map_err(|source| StorageError::Open {
        path: ":memory:".to_string(),
        source,
    })
}

/// SQLite-backed URL frontier
pub struct SqliteFrontier {
    conn: Connection,
}

impl SqliteFrontier {
    /// Opens or creates the frontier database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path, initialize_urls_schema)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory frontier (for tests and throwaway crawls)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = open_in_memory_connection(initialize_urls_schema)?;
        Ok(Self { conn })
    }
}

impl FrontierStore for SqliteFrontier {
    // ===== Crawl Operations =====

    fn seed(&mut self, url: &str) -> StorageResult<bool> {
        let tx = self.conn.transaction()?;

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO urls (url, visited, scraped, attempts) VALUES (?1, 0, 0, 0)",
            params![url],
        )?;
        tx.commit()?;

        Ok(true)
    }

    fn next_batch(&self, limit: usize) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT url FROM urls WHERE visited = 0 ORDER BY rowid LIMIT ?1")?;

        let urls = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(urls)
    }

    fn mark_visited(&mut self, urls: &[String]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("UPDATE urls SET visited = 1 WHERE url = ?1")?;
            for url in urls {
                stmt.execute(params![url])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_if_absent(&mut self, urls: &[String]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO urls (url, visited, scraped, attempts) VALUES (?1, 0, 0, 0)",
            )?;
            for url in urls {
                inserted += stmt.execute(params![url])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn mark_scraped(&mut self, url: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE urls SET visited = 1, scraped = 1 WHERE url = ?1",
            params![url],
        )?;
        Ok(())
    }

    fn record_failure(
        &mut self,
        url: &str,
        policy: FailurePolicy,
    ) -> StorageResult<FailureDisposition> {
        let tx = self.conn.transaction()?;

        let counted = tx.execute(
            "UPDATE urls SET attempts = attempts + 1 WHERE url = ?1 AND scraped = 0",
            params![url],
        )?;
        if counted == 0 {
            // Unknown or already scraped: nothing to put back
            return Ok(FailureDisposition::Abandoned);
        }

        let attempts: u32 = tx.query_row(
            "SELECT attempts FROM urls WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;

        let disposition = if policy.should_requeue(attempts) {
            tx.execute(
                "UPDATE urls SET visited = 0 WHERE url = ?1 AND scraped = 0",
                params![url],
            )?;
            FailureDisposition::Requeued
        } else {
            FailureDisposition::Abandoned
        };

        tx.commit()?;
        Ok(disposition)
    }

    fn reclaim_unfinished(&mut self, policy: FailurePolicy) -> StorageResult<usize> {
        let FailurePolicy::Retry { max_attempts } = policy else {
            return Ok(0);
        };

        let tx = self.conn.transaction()?;
        let reclaimed = tx.execute(
            "UPDATE urls SET visited = 0
             WHERE visited = 1 AND scraped = 0 AND attempts < ?1",
            params![max_attempts],
        )?;
        tx.commit()?;

        Ok(reclaimed)
    }

    // ===== Inspection =====

    fn get_url(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, visited, scraped, attempts FROM urls WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, bool>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((url, visited, scraped, attempts)) = row else {
            return Ok(None);
        };

        let attempts = u32::try_from(attempts).map_err(|_| StorageError::CorruptRecord {
            url: url.clone(),
            reason: format!("attempts out of range: {}", attempts),
        })?;

        Ok(Some(UrlRecord {
            url,
            visited,
            scraped,
            attempts,
        }))
    }

    fn count_urls(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_state(&self, state: UrlState) -> StorageResult<u64> {
        let (visited, scraped) = state.flags();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE visited = ?1 AND scraped = ?2",
            params![visited, scraped],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_with_attempts(&self, min_attempts: u32) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE attempts >= ?1",
            params![min_attempts],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_inconsistent(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE scraped = 1 AND visited = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

/// SQLite-backed article table
pub struct SqliteArticles {
    conn: Connection,
}

impl SqliteArticles {
    /// Opens or creates the articles database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path, initialize_articles_schema)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory article store (for tests and throwaway crawls)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = open_in_memory_connection(initialize_articles_schema)?;
        Ok(Self { conn })
    }
}

impl ArticleStore for SqliteArticles {
    fn insert_if_absent(&mut self, article: &Article) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO articles (url, title, date_published, content, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                article.url,
                article.title,
                article.date_published,
                article.content,
                now
            ],
        )?;
        Ok(inserted == 1)
    }

    fn get_article(&self, url: &str) -> StorageResult<Option<Article>> {
        let article = self
            .conn
            .query_row(
                "SELECT url, title, date_published, content FROM articles WHERE url = ?1",
                params![url],
                |row| {
                    Ok(Article {
                        url: row.get(0)?,
                        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        date_published: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;

        Ok(article)
    }

    fn count_articles(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
