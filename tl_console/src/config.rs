//! Console configuration management.
//!
//! Consolidates all environment variable reads; command-line values take
//! precedence over the environment.

use std::time::Duration;
use tourney_lineup::arrangement::{ContentType, ResponsePolicy};

/// Complete console configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Arrangement service base URL
    pub api_url: String,
    /// Bearer token sent with every request
    pub api_token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Competition selected at startup
    pub competition_id: Option<String>,
    pub content_type: ContentType,
    pub response_policy: ResponsePolicy,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub timeout_secs: Option<u64>,
    pub competition_id: Option<String>,
    pub content_type: Option<ContentType>,
    pub response_policy: Option<ResponsePolicy>,
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

impl ConsoleConfig {
    /// Load configuration from `LINEUP_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to a value that does not parse
    pub fn from_env(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(overrides: ConfigOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_url = overrides
            .api_url
            .or_else(|| read("LINEUP_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "LINEUP_API_URL".to_string(),
                reason: format!("'{}' must start with http:// or https://", api_url),
            });
        }

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => parse_var(&read, "LINEUP_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
        };

        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "LINEUP_TIMEOUT_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        let content_type = match overrides.content_type {
            Some(content_type) => content_type,
            None => parse_var(&read, "LINEUP_CONTENT_TYPE")?.unwrap_or_default(),
        };

        let response_policy = match overrides.response_policy {
            Some(policy) => policy,
            None => parse_var(&read, "LINEUP_RESPONSE_POLICY")?.unwrap_or_default(),
        };

        Ok(ConsoleConfig {
            api_url,
            api_token: overrides.api_token.or_else(|| read("LINEUP_API_TOKEN")),
            timeout: Duration::from_secs(timeout_secs),
            competition_id: overrides
                .competition_id
                .or_else(|| read("LINEUP_COMPETITION_ID")),
            content_type,
            response_policy,
        })
    }
}

/// Parse an optional variable, reporting values that do not parse
fn parse_var<T, F>(read: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    read(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}
