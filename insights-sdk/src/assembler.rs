//! Result assembly
//!
//! Joins a log entry with its captured request and response into a single
//! denormalized record. Client errors (4xx) must carry a structured error
//! body; its name and details are lifted onto the record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorContext, Result, ServiceError};
use crate::services::insights::{LogEntry, Outcome};

/// One structured validation failure reported by the remote platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    /// The request parameter the failure refers to
    #[serde(alias = "id")]
    pub parameter_id: String,

    /// Human readable description
    #[serde(alias = "detail")]
    pub message: String,
}

/// Error body returned with a client error status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub name: String,
    pub error_details: Vec<ErrorDetail>,
}

impl ErrorBody {
    /// Parse an error body, reporting a malformed body instead of guessing
    pub fn parse(response_body: &Value) -> Result<Self> {
        if !response_body.is_object() {
            return Err(ServiceError::malformed_error_body(format!(
                "expected an object, got {}",
                json_type(response_body)
            )));
        }

        ErrorBody::deserialize(response_body)
            .map_err(|e| ServiceError::malformed_error_body(e.to_string()))
    }
}

/// The error fields of a failed call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFailure {
    pub error: String,
    pub error_details: Vec<ErrorDetail>,
}

/// A log entry joined with its request/response detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: Outcome,
    pub status_code: u16,
    pub request: Value,
    pub response: Value,

    /// Present if and only if `status_code` is a 4xx
    #[serde(flatten)]
    pub failure: Option<ClientFailure>,
}

impl ResultRecord {
    /// Error name of a failed call
    pub fn error(&self) -> Option<&str> {
        self.failure.as_ref().map(|f| f.error.as_str())
    }

    /// Structured error details of a failed call
    pub fn error_details(&self) -> Option<&[ErrorDetail]> {
        self.failure.as_ref().map(|f| f.error_details.as_slice())
    }

    pub fn is_client_error(&self) -> bool {
        self.failure.is_some()
    }
}

/// Build a result record from a log entry and its bodies
pub fn assemble(entry: &LogEntry, request_body: Value, response_body: Value) -> Result<ResultRecord> {
    let failure = if entry.is_client_error() {
        let body = ErrorBody::parse(&response_body).map_err(|e| {
            e.with_context(
                ErrorContext::for_service("insights")
                    .status_code(entry.status_code)
                    .with("log_id", &entry.id),
            )
        })?;

        Some(ClientFailure {
            error: body.name,
            error_details: body.error_details,
        })
    } else {
        None
    };

    Ok(ResultRecord {
        id: entry.id.clone(),
        timestamp: entry.timestamp,
        outcome: entry.outcome,
        status_code: entry.status_code,
        request: request_body,
        response: response_body,
        failure,
    })
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
