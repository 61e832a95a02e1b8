use thiserror::Error;

/// Errors that stop a run before any query is dispatched.
///
/// Per-query fetch and extraction problems never surface here; they end up in
/// the query's [`crate::QuerySummary`] instead.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid search URL \"{url}\": {reason}")]
    InvalidSearchUrl { url: String, reason: String },

    #[error("invalid {field} rule \"{selector}\": {reason}")]
    InvalidRule {
        field: String,
        selector: String,
        reason: String,
    },

    #[error("failed to read rules file {path}: {source}")]
    RulesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rules file: {0}")]
    RulesFileParse(#[from] serde_yaml::Error),

    #[error("query batch is empty")]
    EmptyBatch,

    #[error("concurrency limit must be at least 1")]
    InvalidConcurrency,
}
