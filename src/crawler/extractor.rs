//! Page extractor: fetch one URL and turn it into an article plus outbound links

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::parser::{parse_page, LinkFilter, PageSelectors, ParsedPage};
use crate::HarvestError;
use reqwest::Client;
use std::time::Duration;

/// Fetches pages and parses them with the configured selectors
///
/// There is no retry here: a fetch or parse failure ends extraction for that URL.
#[derive(Debug, Clone)]
pub struct Extractor {
    client: Client,
    selectors: PageSelectors,
    filter: LinkFilter,
}

impl Extractor {
    /// Builds the HTTP client and compiles selectors from the configuration
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        Self::with_client(config, client)
    }

    /// Uses a caller-supplied HTTP client
    pub fn with_client(config: &Config, client: Client) -> Result<Self, HarvestError> {
        let selectors = PageSelectors::compile(&config.selectors)?;
        let filter = LinkFilter::new(
            config.crawler.base_url.clone(),
            config.crawler.resolve_relative_links,
        );

        Ok(Self {
            client,
            selectors,
            filter,
        })
    }

    /// Fetches `url` and extracts its article and same-site links
    pub async fn extract(&self, url: &str) -> Result<ParsedPage, HarvestError> {
        let page = fetch_page(&self.client, url).await?;
        tracing::trace!(
            "Fetched {} ({} bytes, HTTP {}, final URL {})",
            url,
            page.body.len(),
            page.status_code,
            page.final_url
        );

        Ok(parse_page(&page.body, url, &self.selectors, &self.filter))
    }
}
