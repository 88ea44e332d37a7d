//! Insights API data models
//!
//! Wire types for the log search and detail endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::mapping::is_client_error_status;

/// Outcome recorded by the remote platform for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

/// The remote platform's record of one historical API invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Identifier used for the detail lookups
    pub id: String,

    /// When the call was made
    pub timestamp: DateTime<Utc>,

    /// Success/failure indicator
    pub outcome: Outcome,

    /// HTTP status returned to the caller
    pub status_code: u16,

    /// HTTP method
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Request url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Operation name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Server-side duration in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

impl LogEntry {
    /// Whether the recorded status is a 4xx
    pub fn is_client_error(&self) -> bool {
        is_client_error_status(self.status_code)
    }
}

/// One page of log search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogPage {
    #[serde(default)]
    pub values: Vec<LogEntry>,

    /// Continuation token, when the store paginates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
}

/// A captured request or response as returned by the detail endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// JSON-encoded body
    #[serde(default)]
    pub body: Option<String>,
}

impl HttpRecord {
    /// The body as structured JSON
    ///
    /// Bodies that are not valid JSON are kept as a JSON string; a missing
    /// body becomes `null`.
    pub fn json_body(&self) -> Value {
        match self.body.as_deref() {
            None => Value::Null,
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
        }
    }
}
