//! Domain types and configuration shared by the `mapscout` crates.

pub mod app_config;
pub mod config;
pub mod records;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, validate_app_config};
pub use records::{BusinessRecord, DedupKey, Query, NO_WEBSITE_SENTINEL};

use thiserror::Error;

/// Errors raised while loading or validating [`AppConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("query must not be empty")]
    EmptyQuery,
}
