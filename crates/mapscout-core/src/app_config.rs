use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings for a scrape run.
///
/// Built by [`crate::load_app_config`]; individual fields may be overridden by
/// the CLI before the run starts.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    /// Search endpoint; `q` and `start` are appended per request.
    pub search_url: String,
    pub request_timeout_secs: u64,
    pub concurrency_limit: usize,
    pub request_delay_min_ms: u64,
    pub request_delay_max_ms: u64,
    pub retry_backoff_base_ms: u64,
    pub blocked_backoff_base_ms: u64,
    pub max_retries: u32,
    pub captcha_retry_budget: u32,
    pub max_records_per_query: usize,
    pub enable_email_enrichment: bool,
    pub enrich_timeout_secs: u64,
    pub max_emails_per_record: usize,
    /// Optional YAML rule table replacing the built-in extraction rules.
    pub rules_path: Option<PathBuf>,
}
