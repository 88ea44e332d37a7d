//! Core abstractions for the Insights SDK
//!
//! - `ServiceClient`: The base trait for all service clients
//! - `LogStore`: The remote log store as seen by the retriever
//! - `ClientBuilder`: Builder for correlated HTTP clients

pub mod builder;
pub use builder::ClientBuilder;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use serde_json::Value;

use crate::error::Result;
use crate::query::LogQuery;
use crate::services::insights::LogEntry;

/// Base trait for all service clients
#[async_trait]
pub trait ServiceClient: Send + Sync {
    /// The client name/identifier
    fn name(&self) -> &str;

    /// The base URL for the service
    fn base_url(&self) -> &str;

    /// Service version
    fn version(&self) -> &str;

    /// Health check for the service
    async fn health_check(&self) -> Result<bool>;

    /// Returns the client's metrics and telemetry if available
    fn metrics(&self) -> Option<HashMap<String, String>>;
}

/// Read-only view of the remote request log store
///
/// Every lookup is eventually consistent with the call that produced it.
/// Detail lookups report `NotYetIndexed` while the body is still being
/// written and `NotFound` only when the identifier is unknown.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Search the log store with the query's filter expression
    async fn list_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>>;

    /// Fetch the captured request body of a log entry
    async fn request_body(&self, log_id: &str) -> Result<Value>;

    /// Fetch the captured response body of a log entry
    async fn response_body(&self, log_id: &str) -> Result<Value>;
}

#[async_trait]
impl<S: LogStore + ?Sized> LogStore for Arc<S> {
    async fn list_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        (**self).list_logs(query).await
    }

    async fn request_body(&self, log_id: &str) -> Result<Value> {
        (**self).request_body(log_id).await
    }

    async fn response_body(&self, log_id: &str) -> Result<Value> {
        (**self).response_body(log_id).await
    }
}
