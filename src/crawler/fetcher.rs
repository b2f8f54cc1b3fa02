//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the HTTP client with the configured user agent
//! - GET requests for page content
//! - Classifying failures as fetch errors (network) or parse errors (not a document)

use crate::config::UserAgentConfig;
use crate::HarvestError;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Page body decoded as text
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use news_harvest::config::UserAgentConfig;
/// use news_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns its body
///
/// # Failure classification
///
/// | Condition | Error |
/// |-----------|-------|
/// | Connection refused, DNS, TLS, timeout | `Fetch` |
/// | Body could not be read | `Fetch` |
/// | Content-Type is not a text/markup type | `Parse` |
///
/// Non-2xx responses are still returned: their body is a document like any other.
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, HarvestError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| HarvestError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        tracing::debug!("{} answered with HTTP {}", url, status.as_u16());
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase());

    if let Some(content_type) = &content_type {
        if !is_document_type(content_type) {
            return Err(HarvestError::Parse {
                url: url.to_string(),
                message: format!("not an HTML document (content-type {})", content_type),
            });
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| HarvestError::Fetch {
            url: url.to_string(),
            source,
        })?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Returns true for Content-Type values an HTML parser can make sense of
fn is_document_type(content_type: &str) -> bool {
    content_type.starts_with("text/")
        || content_type.contains("html")
        || content_type.contains("xml")
}
