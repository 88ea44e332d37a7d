//! Configuration management for the insights client and retriever
//!
//! Values come from config providers (environment variables or in-memory
//! maps) and are validated into typed configs. An unset key falls back to
//! its default; a set but invalid value is always an error.

use std::env;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use crate::correlation::CorrelationId;
use crate::error::{Result, ServiceError};
use crate::resilience::RetryConfig;
use crate::util::parse_duration;
use once_cell::sync::Lazy;

/// Base trait for configuration providers
pub trait ConfigProvider: Send + Sync {
    /// Raw value of `key`, or `None` if it is not set
    fn get_value(&self, key: &str) -> Result<Option<String>>;

    /// Get a string configuration value that must be set
    fn get_string(&self, key: &str) -> Result<String> {
        self.get_value(key)?
            .ok_or_else(|| ServiceError::configuration(format!("Configuration key not set: {}", key)))
    }
}

/// Typed accessors for configuration providers
pub trait ConfigProviderExt: ConfigProvider {
    /// Get a typed configuration value by parsing from string
    fn get<T>(&self, key: &str) -> Result<T>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        let value = self.get_string(key)?;
        value.parse::<T>()
            .map_err(|e| ServiceError::configuration(format!("Invalid value for key {}: {}", key, e)))
    }

    /// Get a typed value if the key is set; a set but unparseable value is an error
    fn get_opt<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        <T as FromStr>::Err: std::fmt::Display,
    {
        match self.get_value(key)? {
            Some(_) => self.get::<T>(key).map(Some),
            None => Ok(None),
        }
    }

    /// Get a duration value (`"500ms"`, `"2s"`, `"1m"`, `"1h"` or bare seconds)
    fn get_duration(&self, key: &str) -> Result<Duration> {
        let value = self.get_string(key)?;
        parse_duration(&value)
            .ok_or_else(|| ServiceError::configuration(format!("Invalid duration for key {}: {}", key, value)))
    }

    /// Get a duration if the key is set
    fn get_duration_opt(&self, key: &str) -> Result<Option<Duration>> {
        match self.get_value(key)? {
            Some(_) => self.get_duration(key).map(Some),
            None => Ok(None),
        }
    }
}

impl<T: ConfigProvider + ?Sized> ConfigProviderExt for T {}

/// Environment variable based configuration provider
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    /// Optional prefix for environment variables
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment variable config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for environment variables
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Format a configuration key as an environment variable
    fn format_key(&self, key: &str) -> String {
        let key = key.to_uppercase().replace(|c: char| !c.is_ascii_alphanumeric(), "_");
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key),
            None => key,
        }
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn get_value(&self, key: &str) -> Result<Option<String>> {
        let env_key = self.format_key(key);

        match env::var(&env_key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(ServiceError::configuration(format!(
                "Environment variable is not valid unicode: {}",
                env_key
            ))),
        }
    }
}

/// In-memory config provider for testing or static configuration
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigProvider {
    /// Configuration values
    values: HashMap<String, String>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial values
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl ConfigProvider for MemoryConfigProvider {
    fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }
}

/// Global default configuration provider, reading `INSIGHTS_*` variables
pub static DEFAULT_PROVIDER: Lazy<Arc<EnvConfigProvider>> = Lazy::new(|| {
    Arc::new(EnvConfigProvider::new().with_prefix("INSIGHTS"))
});

/// Trait for service-specific configuration
pub trait ServiceConfig: Debug + Send + Sync {
    /// Validate this configuration
    fn validate(&self) -> Result<()>;

    /// Service name
    fn service_name(&self) -> &str;
}

/// Connection settings for the insights API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Bearer token
    pub api_token: String,

    /// Base URL of the insights API
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_seconds: u64,

    /// Correlation id to tag the client's own requests with
    pub correlation_id: Option<CorrelationId>,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: "http://localhost:8080/insights".to_string(),
            timeout_seconds: 30,
            correlation_id: None,
        }
    }
}

impl InsightsConfig {
    /// Load and validate configuration from a config provider
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let config = Self::layered(provider)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overlaid with whatever keys the provider sets, without validation
    ///
    /// Missing keys keep their defaults, so the result may still lack a
    /// token. Values that are set but invalid are reported.
    pub fn layered<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();

        let correlation_id = match provider.get_value("correlation_id")? {
            Some(token) => Some(CorrelationId::parse(token)?),
            None => None,
        };

        Ok(Self {
            api_token: provider.get_opt::<String>("api_token")?.unwrap_or(defaults.api_token),
            base_url: provider.get_opt::<String>("base_url")?.unwrap_or(defaults.base_url),
            timeout_seconds: provider.get_opt::<u64>("timeout_seconds")?.unwrap_or(defaults.timeout_seconds),
            correlation_id,
        })
    }
}

impl ServiceConfig for InsightsConfig {
    fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(ServiceError::configuration("Insights API token is required"));
        }

        if self.base_url.is_empty() {
            return Err(ServiceError::configuration("Insights base URL is required"));
        }

        if self.timeout_seconds == 0 {
            return Err(ServiceError::configuration("Insights timeout must be at least one second"));
        }

        Ok(())
    }

    fn service_name(&self) -> &str {
        "insights"
    }
}

/// Polling behaviour of the log retriever
#[derive(Debug, Clone, PartialEq)]
pub struct RetrieverConfig {
    /// Backoff policy and default attempt ceiling
    pub retry: RetryConfig,

    /// Maximum number of detail fetches in flight
    pub detail_concurrency: usize,

    /// Optional wall-clock bound on a whole retrieval
    pub deadline: Option<Duration>,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            detail_concurrency: 4,
            deadline: None,
        }
    }
}

impl RetrieverConfig {
    /// Load configuration from a config provider, falling back to defaults for unset keys
    pub fn from_provider<P: ConfigProvider + ?Sized>(provider: &P) -> Result<Self> {
        let defaults = Self::default();
        let retry_defaults = &defaults.retry;

        let retry = RetryConfig {
            max_attempts: provider.get_opt::<u32>("max_attempts")?.unwrap_or(retry_defaults.max_attempts),
            initial_interval: provider
                .get_duration_opt("initial_interval")?
                .unwrap_or(retry_defaults.initial_interval),
            max_interval: provider.get_duration_opt("max_interval")?.unwrap_or(retry_defaults.max_interval),
            multiplier: provider.get_opt::<f64>("multiplier")?.unwrap_or(retry_defaults.multiplier),
            randomization_factor: provider
                .get_opt::<f64>("randomization_factor")?
                .unwrap_or(retry_defaults.randomization_factor),
        };

        let config = Self {
            retry,
            detail_concurrency: provider
                .get_opt::<usize>("detail_concurrency")?
                .unwrap_or(defaults.detail_concurrency),
            deadline: provider.get_duration_opt("deadline")?,
        };

        config.validate()?;
        Ok(config)
    }
}

impl ServiceConfig for RetrieverConfig {
    fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(ServiceError::configuration("max_attempts must be at least 1"));
        }

        if self.detail_concurrency == 0 {
            return Err(ServiceError::configuration("detail_concurrency must be at least 1"));
        }

        self.retry.validate()
    }

    fn service_name(&self) -> &str {
        "insights-retriever"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_format() {
        let provider = EnvConfigProvider::new().with_prefix("INSIGHTS");
        assert_eq!(provider.format_key("max-attempts"), "INSIGHTS_MAX_ATTEMPTS");
        assert_eq!(EnvConfigProvider::new().format_key("api_token"), "API_TOKEN");
    }

    #[test]
    fn test_unset_env_value_is_none() {
        let provider = EnvConfigProvider::new().with_prefix("INSIGHTS_TEST_UNSET_7F3A");
        assert_eq!(provider.get_value("api_token").unwrap(), None);
        assert!(provider.get_string("api_token").is_err());
    }
}
