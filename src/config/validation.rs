use crate::config::types::{ArchiveConfig, CacheConfig, Config, HttpConfig};
use crate::ConfigError;

/// Upper bound for either HTTP timeout (seconds)
const MAX_TIMEOUT_SECS: u64 = 600;

/// Upper bound for concurrent archive downloads
const MAX_CONCURRENT_DOWNLOADS: usize = 64;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_cache_config(&config.cache)?;
    validate_archive_config(&config.archive)?;
    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    // Header values must be visible ASCII or spaces
    if !config
        .user_agent
        .chars()
        .all(|c| c.is_ascii_graphic() || c == ' ')
    {
        return Err(ConfigError::Validation(format!(
            "user_agent must contain only printable ASCII characters, got '{}'",
            config.user_agent
        )));
    }

    if config.timeout_secs < 1 || config.timeout_secs > MAX_TIMEOUT_SECS {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be between 1 and {}, got {}",
            MAX_TIMEOUT_SECS, config.timeout_secs
        )));
    }

    if config.connect_timeout_secs < 1 || config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and timeout_secs ({}), got {}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates cache configuration
fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.enabled && config.ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "ttl_secs must be >= 1 when the cache is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates archive configuration
fn validate_archive_config(config: &ArchiveConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_downloads < 1
        || config.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS
    {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_downloads must be between 1 and {}, got {}",
            MAX_CONCURRENT_DOWNLOADS, config.max_concurrent_downloads
        )));
    }

    Ok(())
}
