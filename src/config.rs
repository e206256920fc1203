//! Configuration management for stepguard.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `STEPGUARD_MODEL` - Optional. Multimodal model used to judge evidence. Defaults to `google/gemini-2.5-pro`.
//! - `ANALYZER_TIMEOUT_SECS` - Optional. Upper bound on one evidence analysis, retries included. Defaults to `90`.
//! - `LLM_MAX_RETRIES` - Optional. Retries for transient LLM errors. Defaults to `3`.
//! - `STEPGUARD_ALERT_LOG` - Optional. File that alerting reports are appended to as JSON lines.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::llm::RetryConfig;

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-pro";
const DEFAULT_TIMEOUT_SECS: u64 = 90;
const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// OpenRouter API key
    pub api_key: String,

    /// Model identifier (OpenRouter format)
    pub model: String,

    /// Timeout applied to each evidence analysis
    pub analyzer_timeout: Duration,

    /// Retry behavior for transient LLM errors
    pub retry: RetryConfig,

    /// Optional JSON-lines alert log
    pub alert_log: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set,
    /// and `ConfigError::InvalidValue` for unparseable numbers.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let model = std::env::var("STEPGUARD_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = parse_var("ANALYZER_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "ANALYZER_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let max_retries = parse_var("LLM_MAX_RETRIES", DEFAULT_MAX_RETRIES)?;

        let alert_log = std::env::var("STEPGUARD_ALERT_LOG").ok().map(PathBuf::from);

        Ok(Self {
            analyzer_timeout: Duration::from_secs(timeout_secs),
            retry: RetryConfig {
                max_retries,
                ..RetryConfig::default()
            },
            api_key,
            model,
            alert_log,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            analyzer_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig::default(),
            alert_log: None,
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}
