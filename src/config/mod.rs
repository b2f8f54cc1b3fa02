//! Configuration module for News-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All settings have compiled-in defaults; a file only overrides what it names.
//!
//! # Example
//!
//! ```no_run
//! use news_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling from: {}", config.crawler.seed_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SelectorConfig, UserAgentConfig, DEFAULT_SITE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

impl Config {
    /// Validates this configuration
    pub fn validate(&self) -> crate::ConfigResult<()> {
        validation::validate(self)
    }
}
