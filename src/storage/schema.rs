//! Database schema definitions
//!
//! The frontier and the articles live in separate database files, so each has
//! its own schema.

/// SQL schema for the URL frontier database
pub const URLS_SCHEMA_SQL: &str = r#"
-- Every URL ever discovered, with its crawl state
CREATE TABLE IF NOT EXISTS urls (
    url TEXT PRIMARY KEY,
    visited BOOLEAN NOT NULL DEFAULT 0,
    scraped BOOLEAN NOT NULL DEFAULT 0,
    attempts INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_urls_visited ON urls(visited);
"#;

/// SQL schema for the articles database
pub const ARTICLES_SCHEMA_SQL: &str = r#"
-- One extracted article per URL, first write wins
CREATE TABLE IF NOT EXISTS articles (
    url TEXT PRIMARY KEY,
    title TEXT,
    date_published TEXT,
    content TEXT,
    fetched_at TEXT
);
"#;

/// Initializes the frontier schema
pub fn initialize_urls_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(URLS_SCHEMA_SQL)?;
    Ok(())
}

/// Initializes the articles schema
pub fn initialize_articles_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(ARTICLES_SCHEMA_SQL)?;
    Ok(())
}
