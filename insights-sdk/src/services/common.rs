//! Common utilities for service clients
//!
//! This module provides shared functionality for the HTTP clients.

use std::fmt;
use std::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;

use crate::error::{ServiceError, ErrorContext};
use crate::error::mapping::{classify_http_error, map_http_error};

/// UserAgent structure for identifying the client to upstream services
#[derive(Debug, Clone)]
pub struct UserAgent {
    /// Application name
    pub app_name: String,

    /// Version string
    pub version: String,

    /// Optional extra info
    pub extra: Option<String>,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            app_name: "Insights-SDK".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            extra: None,
        }
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_name, self.version)?;

        if let Some(ref extra) = self.extra {
            write!(f, " ({})", extra)?;
        }

        Ok(())
    }
}

/// Request counters kept by each client
#[derive(Debug, Default)]
pub(crate) struct ClientMetrics {
    request_count: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    not_indexed_count: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl ClientMetrics {
    pub(crate) fn record_success(&self, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self, latency: Duration, error: &ServiceError) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency.as_millis() as u64, Ordering::Relaxed);

        // Indexing lag is expected while polling and is not counted as an error
        if error.is_not_yet_indexed() {
            self.not_indexed_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn as_map(&self) -> HashMap<String, String> {
        let requests = self.request_count.load(Ordering::Relaxed);
        let avg_ms = if requests == 0 {
            0
        } else {
            self.total_latency_ms.load(Ordering::Relaxed) / requests
        };

        let mut map = HashMap::new();
        map.insert("request_count".to_string(), requests.to_string());
        map.insert("success_count".to_string(), self.success_count.load(Ordering::Relaxed).to_string());
        map.insert("error_count".to_string(), self.error_count.load(Ordering::Relaxed).to_string());
        map.insert("not_indexed_count".to_string(), self.not_indexed_count.load(Ordering::Relaxed).to_string());
        map.insert("avg_latency_ms".to_string(), avg_ms.to_string());
        map
    }
}

/// Create error context for HTTP requests
pub fn create_error_context(
    service_name: &str,
    endpoint: &str,
    status: Option<reqwest::StatusCode>,
) -> ErrorContext {
    let mut context = ErrorContext::for_service(service_name).endpoint(endpoint);

    if let Some(status_code) = status {
        context = context
            .status_code(status_code.as_u16())
            .with("category", classify_http_error(status_code));
    }

    context
}

/// Parse error response from HTTP response
pub async fn parse_error_response(
    service_name: &str,
    endpoint: &str,
    response: reqwest::Response,
    definitive_not_found: &[String],
) -> ServiceError {
    let status = response.status();
    let mut context = create_error_context(service_name, endpoint, Some(status));

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("Failed to read error response: {}", e),
    };

    map_http_error(status, &body, &mut context, definitive_not_found)
        .with_context(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_display() {
        let ua = UserAgent {
            app_name: "notebook".to_string(),
            version: "1.2".to_string(),
            extra: Some("valuation-demo".to_string()),
        };
        assert_eq!(ua.to_string(), "notebook/1.2 (valuation-demo)");
    }

    #[test]
    fn test_metrics_separate_indexing_lag() {
        let metrics = ClientMetrics::default();
        metrics.record_success(Duration::from_millis(10));
        metrics.record_error(Duration::from_millis(20), &ServiceError::not_yet_indexed("pending"));
        metrics.record_error(Duration::from_millis(30), &ServiceError::network("down"));

        let map = metrics.as_map();
        assert_eq!(map["request_count"], "3");
        assert_eq!(map["success_count"], "1");
        assert_eq!(map["error_count"], "1");
        assert_eq!(map["not_indexed_count"], "1");
        assert_eq!(map["avg_latency_ms"], "20");
    }
}
