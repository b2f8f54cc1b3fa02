use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::crawler::PageSelectors;
use crate::state::FailurePolicy;
use crate::ConfigError;
use url::Url;

const MAX_BATCH_SIZE: usize = 10_000;
const MAX_WORKER_COUNT: usize = 1_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    PageSelectors::compile(&config.selectors)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.worker_count < 1 || config.worker_count > MAX_WORKER_COUNT {
        return Err(ConfigError::Validation(format!(
            "worker_count must be between 1 and {}, got {}",
            MAX_WORKER_COUNT, config.worker_count
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request_timeout_secs must be >= 1".to_string(),
        ));
    }

    validate_http_url("seed_url", &config.seed_url)?;
    validate_http_url("base_url", &config.base_url)?;

    if !config.seed_url.starts_with(&config.base_url) {
        return Err(ConfigError::Validation(format!(
            "seed_url '{}' must start with base_url '{}'",
            config.seed_url, config.base_url
        )));
    }

    if let FailurePolicy::Retry { max_attempts } = config.failure_policy {
        if max_attempts < 1 {
            return Err(ConfigError::Validation(
                "failure_policy max_attempts must be >= 1".to_string(),
            ));
        }
    }

    if config.max_batches == Some(0) {
        return Err(ConfigError::Validation(
            "max_batches must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.urls_database_path.is_empty() {
        return Err(ConfigError::Validation(
            "urls_database_path cannot be empty".to_string(),
        ));
    }

    if config.articles_database_path.is_empty() {
        return Err(ConfigError::Validation(
            "articles_database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
