use std::time::Duration;

use mapscout_core::AppConfig;

use crate::backoff::BackoffPolicy;

/// Runtime knobs for one scrape run, derived from [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    pub search_url: String,
    pub request_timeout: Duration,
    pub concurrency_limit: usize,
    pub backoff: BackoffPolicy,
    /// Consecutive failed attempts tolerated before a session aborts.
    pub max_retries: u32,
    /// Consecutive blocked attempts tolerated before a session aborts.
    pub captcha_retry_budget: u32,
    pub max_records_per_query: usize,
    pub enable_email_enrichment: bool,
    pub enrich_timeout: Duration,
    pub max_emails_per_record: usize,
}

impl ScrapeConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_url: config.search_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            concurrency_limit: config.concurrency_limit,
            backoff: BackoffPolicy {
                delay_min_ms: config.request_delay_min_ms,
                delay_max_ms: config.request_delay_max_ms,
                retry_base_ms: config.retry_backoff_base_ms,
                blocked_base_ms: config.blocked_backoff_base_ms,
            },
            max_retries: config.max_retries,
            captcha_retry_budget: config.captcha_retry_budget,
            max_records_per_query: config.max_records_per_query,
            enable_email_enrichment: config.enable_email_enrichment,
            enrich_timeout: Duration::from_secs(config.enrich_timeout_secs),
            max_emails_per_record: config.max_emails_per_record,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.google.com/search?tbm=lcl&hl=en".to_owned(),
            request_timeout: Duration::from_secs(15),
            concurrency_limit: 2,
            backoff: BackoffPolicy {
                delay_min_ms: 2_500,
                delay_max_ms: 5_500,
                retry_base_ms: 4_000,
                blocked_base_ms: 30_000,
            },
            max_retries: 3,
            captcha_retry_budget: 2,
            max_records_per_query: 100,
            enable_email_enrichment: false,
            enrich_timeout: Duration::from_secs(6),
            max_emails_per_record: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mapscout_core::Environment;

    use super::*;

    #[test]
    fn converts_units_and_budgets() {
        let app = AppConfig {
            env: Environment::Test,
            log_level: "debug".to_owned(),
            search_url: "http://127.0.0.1:9/search".to_owned(),
            request_timeout_secs: 20,
            concurrency_limit: 4,
            request_delay_min_ms: 100,
            request_delay_max_ms: 200,
            retry_backoff_base_ms: 300,
            blocked_backoff_base_ms: 400,
            max_retries: 5,
            captcha_retry_budget: 1,
            max_records_per_query: 40,
            enable_email_enrichment: true,
            enrich_timeout_secs: 3,
            max_emails_per_record: 2,
            rules_path: Some(PathBuf::from("rules.yaml")),
        };
        let cfg = ScrapeConfig::from_app_config(&app);
        assert_eq!(cfg.request_timeout, Duration::from_secs(20));
        assert_eq!(cfg.enrich_timeout, Duration::from_secs(3));
        assert_eq!(cfg.backoff.delay_max_ms, 200);
        assert_eq!(cfg.backoff.blocked_base_ms, 400);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.captcha_retry_budget, 1);
        assert_eq!(cfg.max_records_per_query, 40);
        assert!(cfg.enable_email_enrichment);
    }

    #[test]
    fn default_matches_documented_defaults() {
        let cfg = ScrapeConfig::default();
        assert_eq!(cfg.concurrency_limit, 2);
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.enrich_timeout < cfg.request_timeout);
    }
}
