use crate::config::types::{Config, CrawlSettings, OutputSettings};
use crate::url::parse_entrypoint;
use crate::ConfigError;

/// Shortest navigation timeout accepted (milliseconds)
const MIN_NAVIGATION_TIMEOUT_MS: u64 = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_settings(&config.crawl)?;
    validate_output_settings(&config.output)?;
    Ok(())
}

/// Validates crawl settings
fn validate_crawl_settings(settings: &CrawlSettings) -> Result<(), ConfigError> {
    if settings.entrypoint.trim().is_empty() {
        return Err(ConfigError::Validation(
            "entrypoint cannot be empty".to_string(),
        ));
    }

    parse_entrypoint(&settings.entrypoint).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid entrypoint '{}': {}",
            settings.entrypoint, e
        ))
    })?;

    if let Some(timeout) = settings.navigation_timeout_ms {
        if timeout < MIN_NAVIGATION_TIMEOUT_MS {
            return Err(ConfigError::Validation(format!(
                "navigation_timeout_ms must be >= {}ms, got {}ms",
                MIN_NAVIGATION_TIMEOUT_MS, timeout
            )));
        }
    }

    // Cross-origin mirroring is not supported
    if !settings.same_origin_only {
        return Err(ConfigError::Validation(
            "same_origin_only must be true".to_string(),
        ));
    }

    Ok(())
}

/// Validates output settings
fn validate_output_settings(settings: &OutputSettings) -> Result<(), ConfigError> {
    if settings.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    for (name, path) in [
        ("report_path", &settings.report_path),
        ("json_report_path", &settings.json_report_path),
    ] {
        if path.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty when set",
                name
            )));
        }
    }

    Ok(())
}
