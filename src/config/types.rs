use crate::state::FailurePolicy;
use serde::Deserialize;

/// Site crawled when no configuration overrides it
pub const DEFAULT_SITE: &str = "https://www.eenadu.net";

/// Main configuration structure for News-Harvest
///
/// Every section has compiled-in defaults, so `Config::default()` is a complete
/// configuration and a TOML file only needs the keys it changes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Root URL the crawl starts from
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Prefix an outbound link must carry to count as same-site
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of unvisited URLs claimed per batch
    #[serde(rename = "batch-size")]
    pub batch_size: usize,

    /// Maximum number of URLs processed concurrently within a batch
    #[serde(rename = "worker-count")]
    pub worker_count: usize,

    /// Pause between batches (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Resolve relative hrefs against the page URL before the same-site check
    #[serde(rename = "resolve-relative-links")]
    pub resolve_relative_links: bool,

    /// Stop draining after this many batches
    #[serde(rename = "max-batches")]
    pub max_batches: Option<u64>,

    #[serde(rename = "failure-policy")]
    pub failure_policy: FailurePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: DEFAULT_SITE.to_string(),
            base_url: DEFAULT_SITE.to_string(),
            batch_size: 100,
            worker_count: 20,
            poll_interval_ms: 1000,
            request_timeout_secs: 30,
            resolve_relative_links: false,
            max_batches: None,
            failure_policy: FailurePolicy::Abandon,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "news-harvest".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database holding the URL frontier
    #[serde(rename = "urls-database-path")]
    pub urls_database_path: String,

    /// Path to the SQLite database holding extracted articles
    #[serde(rename = "articles-database-path")]
    pub articles_database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            urls_database_path: "urls.db".to_string(),
            articles_database_path: "articles.db".to_string(),
        }
    }
}

/// CSS selectors used to locate article fields
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// The "full story" region; title, content and date are searched inside it
    pub story: String,

    pub title: String,

    /// Every match inside the story region contributes to the body
    pub content: String,

    #[serde(rename = "date-published")]
    pub date_published: String,

    /// Anchor elements scanned across the whole document
    pub link: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            story: "div.fullstory, section.fullstory".to_string(),
            title: "h1".to_string(),
            content: "p".to_string(),
            date_published: "div.pub-t".to_string(),
            link: "a[href]".to_string(),
        }
    }
}
