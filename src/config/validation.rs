use crate::config::types::{Config, CrawlBudget, SessionConfig, MIN_REQUESTS_PER_SECOND};
use crate::ConfigError;
use reqwest::header::{HeaderName, HeaderValue};

/// Upper bound for the per-batch worker pool
pub const MAX_CONCURRENCY_LIMIT: usize = 50;

/// Upper bound for redirect follows
pub const MAX_REDIRECTS_LIMIT: usize = 30;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_budget(&config.crawler.budget())?;
    validate_priority_patterns(&config.crawler.priority_patterns)?;
    validate_session_config(&config.session)?;
    Ok(())
}

/// Validates crawl budget limits
pub fn validate_budget(budget: &CrawlBudget) -> Result<(), ConfigError> {
    if budget.max_urls < 1 {
        return Err(ConfigError::Validation(format!(
            "max_urls must be >= 1, got {}",
            budget.max_urls
        )));
    }

    if budget.max_depth < 1 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be >= 1, got {}",
            budget.max_depth
        )));
    }

    if budget.max_concurrency < 1 || budget.max_concurrency > MAX_CONCURRENCY_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY_LIMIT, budget.max_concurrency
        )));
    }

    Ok(())
}

fn validate_priority_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    if patterns.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "priority_patterns cannot contain empty entries".to_string(),
        ));
    }
    Ok(())
}

/// Validates HTTP session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be >= 1, got {}",
            config.connect_timeout_secs
        )));
    }

    if config.max_redirects > MAX_REDIRECTS_LIMIT {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= {}, got {}",
            MAX_REDIRECTS_LIMIT, config.max_redirects
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(rate) = config.requests_per_second {
        if !rate.is_finite() || rate < MIN_REQUESTS_PER_SECOND {
            return Err(ConfigError::Validation(format!(
                "requests_per_second must be >= {}, got {}",
                MIN_REQUESTS_PER_SECOND, rate
            )));
        }
    }

    validate_header("User-Agent", &config.user_agent)?;
    validate_header("Accept", &config.accept)?;
    validate_header("Accept-Language", &config.accept_language)?;
    for (name, value) in &config.headers {
        validate_header(name, value)?;
    }

    Ok(())
}

/// Checks that a header name and value can be sent on the wire
fn validate_header(name: &str, value: &str) -> Result<(), ConfigError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::Validation(format!("Invalid header name '{}'", name)))?;
    HeaderValue::from_str(value).map_err(|_| {
        ConfigError::Validation(format!("Invalid value for header '{}': '{}'", name, value))
    })?;
    Ok(())
}
