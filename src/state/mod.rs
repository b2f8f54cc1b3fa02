//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: the lifecycle of a frontier URL (unvisited, visited, scraped)
//! - `FailurePolicy`: whether a failed URL is abandoned or returned to the frontier
//! - `FailureDisposition`: what a recorded failure actually did

mod url_state;

// Re-export main types
pub use url_state::{FailureDisposition, FailurePolicy, UrlState};
