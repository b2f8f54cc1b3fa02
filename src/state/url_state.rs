/// Frontier state definitions for tracking crawl progress
///
/// A URL row persists two flags, `visited` and `scraped`. This module gives the
/// valid flag combinations names and defines what happens to a URL whose
/// worker fails.
use serde::Deserialize;
use std::fmt;

/// Represents where a URL is in its crawl lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlState {
    /// Discovered but not yet claimed by a batch
    Unvisited,

    /// Claimed by a batch; either still in flight or its worker failed
    Visited,

    /// Article stored and the URL fully processed
    Scraped,
}

impl UrlState {
    /// Derives the state from the persisted flags
    ///
    /// Returns None for `scraped && !visited`, which must never be stored.
    pub fn from_flags(visited: bool, scraped: bool) -> Option<Self> {
        match (visited, scraped) {
            (false, false) => Some(Self::Unvisited),
            (true, false) => Some(Self::Visited),
            (true, true) => Some(Self::Scraped),
            (false, true) => None,
        }
    }

    /// Returns the `(visited, scraped)` flags for this state
    pub fn flags(&self) -> (bool, bool) {
        match self {
            Self::Unvisited => (false, false),
            Self::Visited => (true, false),
            Self::Scraped => (true, true),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unvisited => "unvisited",
            Self::Visited => "visited",
            Self::Scraped => "scraped",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do with a URL whose worker failed before it was scraped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Leave the URL visited and unscraped forever
    Abandon,

    /// Return the URL to the frontier until it has failed `max_attempts` times
    Retry {
        #[serde(rename = "max-attempts")]
        max_attempts: u32,
    },
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Abandon
    }
}

impl FailurePolicy {
    /// Decides whether a URL that has now failed `attempts` times goes back to the frontier
    pub fn should_requeue(&self, attempts: u32) -> bool {
        match self {
            Self::Abandon => false,
            Self::Retry { max_attempts } => attempts < *max_attempts,
        }
    }
}

/// Outcome of recording a failure against a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// The URL stays visited and will not be fetched again
    Abandoned,

    /// The URL was reset to unvisited and will be claimed by a later batch
    Requeued,
}
