use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed or the combination of
/// values is inconsistent.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value cannot be parsed or fails validation.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("MAPSCOUT_ENV", "development"))?;
    let log_level = or_default("MAPSCOUT_LOG_LEVEL", "info");

    let search_url = or_default(
        "MAPSCOUT_SEARCH_URL",
        "https://www.google.com/search?tbm=lcl&hl=en",
    );
    if !(search_url.starts_with("https://") || search_url.starts_with("http://")) {
        return Err(invalid(
            "MAPSCOUT_SEARCH_URL",
            format!("\"{search_url}\" is not an absolute http(s) URL"),
        ));
    }

    let request_timeout_secs = parse_u64("MAPSCOUT_REQUEST_TIMEOUT_SECS", "15")?;
    let concurrency_limit = parse_usize("MAPSCOUT_CONCURRENCY_LIMIT", "2")?;
    let request_delay_min_ms = parse_u64("MAPSCOUT_REQUEST_DELAY_MIN_MS", "2500")?;
    let request_delay_max_ms = parse_u64("MAPSCOUT_REQUEST_DELAY_MAX_MS", "5500")?;
    let retry_backoff_base_ms = parse_u64("MAPSCOUT_RETRY_BACKOFF_BASE_MS", "4000")?;
    let blocked_backoff_base_ms = parse_u64("MAPSCOUT_BLOCKED_BACKOFF_BASE_MS", "30000")?;
    let max_retries = parse_u32("MAPSCOUT_MAX_RETRIES", "3")?;
    let captcha_retry_budget = parse_u32("MAPSCOUT_CAPTCHA_RETRY_BUDGET", "2")?;
    let max_records_per_query = parse_usize("MAPSCOUT_MAX_RECORDS_PER_QUERY", "100")?;
    let enable_email_enrichment = parse_bool(
        "MAPSCOUT_ENABLE_EMAIL_ENRICHMENT",
        &or_default("MAPSCOUT_ENABLE_EMAIL_ENRICHMENT", "false"),
    )?;
    let enrich_timeout_secs = parse_u64("MAPSCOUT_ENRICH_TIMEOUT_SECS", "6")?;
    let max_emails_per_record = parse_usize("MAPSCOUT_MAX_EMAILS_PER_RECORD", "3")?;
    let rules_path = lookup("MAPSCOUT_RULES_PATH")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let config = AppConfig {
        env,
        log_level,
        search_url,
        request_timeout_secs,
        concurrency_limit,
        request_delay_min_ms,
        request_delay_max_ms,
        retry_backoff_base_ms,
        blocked_backoff_base_ms,
        max_retries,
        captcha_retry_budget,
        max_records_per_query,
        enable_email_enrichment,
        enrich_timeout_secs,
        max_emails_per_record,
        rules_path,
    };
    validate_app_config(&config)?;
    Ok(config)
}

/// Cross-field checks applied after parsing. Also called by the CLI after it
/// applies flag overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the first violated rule.
pub fn validate_app_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.concurrency_limit == 0 {
        return Err(ConfigError::Validation(
            "concurrency limit must be at least 1".to_string(),
        ));
    }
    if config.max_records_per_query == 0 {
        return Err(ConfigError::Validation(
            "max records per query must be at least 1".to_string(),
        ));
    }
    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request timeout must be at least 1 second".to_string(),
        ));
    }
    if config.request_delay_min_ms > config.request_delay_max_ms {
        return Err(ConfigError::Validation(format!(
            "request delay range is inverted: min {}ms > max {}ms",
            config.request_delay_min_ms, config.request_delay_max_ms
        )));
    }
    if config.enable_email_enrichment
        && config.enrich_timeout_secs >= config.request_timeout_secs
    {
        return Err(ConfigError::Validation(format!(
            "enrichment timeout ({}s) must be shorter than the request timeout ({}s)",
            config.enrich_timeout_secs, config.request_timeout_secs
        )));
    }
    Ok(())
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s.trim() {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "MAPSCOUT_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
