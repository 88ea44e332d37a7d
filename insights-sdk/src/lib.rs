//! # Insights SDK
//!
//! Client-side retrieval of correlated request/response logs from a
//! platform insights API whose log index is eventually consistent.
//!
//! This crate provides:
//!
//! - Correlated HTTP clients: every originating call carries a session
//!   `CorrelationId`
//! - A `LogRetriever` that polls the log store with exponential backoff
//!   until the expected calls are indexed, then fetches each call's
//!   request and response bodies
//! - Assembly of log entries and bodies into `ResultRecord`s, with client
//!   errors parsed from an explicit error-body schema
//! - Configuration management utilities
//!
//! ## Architecture
//!
//! - `LogStore`: The seam between retrieval logic and the remote service
//! - `InsightsClient`: The HTTP implementation of `LogStore`
//! - `RetryExecutor`: Attempt-bounded polling and retry loops
//! - `ServiceError`: Error system separating transport failures, indexing
//!   timeouts, genuine absence and malformed error bodies

// Re-export core modules
pub mod core;
pub use self::core::{ClientBuilder, LogStore, ServiceClient};

pub mod correlation;
pub use correlation::CorrelationId;

pub mod query;
pub use query::LogQuery;

// Re-export service-specific modules
pub mod services;
pub use services::insights::{InsightsClient, LogEntry, Outcome};

// Re-export error handling
pub mod error;
pub use error::{ErrorContext, ErrorKind, Result, ServiceError};

// Re-export resilience patterns
pub mod resilience;
pub use resilience::{RetryConfig, RetryExecutor};

pub mod retriever;
pub use retriever::{Detail, LogFetch, LogRetriever};

pub mod assembler;
pub use assembler::{assemble, ErrorDetail, ResultRecord};

pub mod report;

// Re-export configuration management
pub mod config;
pub use config::{ConfigProvider, InsightsConfig, RetrieverConfig, ServiceConfig};

// Utility module for common functionality
mod util;

#[cfg(test)]
mod tests;

/// Create a new default client builder
pub fn client() -> self::core::ClientBuilder {
    self::core::ClientBuilder::new()
}

/// Create an insights client configured from `INSIGHTS_*` environment variables
pub fn insights_client() -> Result<InsightsClient> {
    InsightsClient::from_env()
}

/// Create a retriever over an environment-configured insights client
pub fn retriever_from_env() -> Result<LogRetriever<InsightsClient>> {
    let config = RetrieverConfig::from_provider(&**config::DEFAULT_PROVIDER)?;
    LogRetriever::with_config(InsightsClient::from_env()?, config)
}
