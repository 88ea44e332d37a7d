//! Error mapping for the insights API
//!
//! Converts HTTP error responses into normalized `ServiceError` values.
//! The remote platform answers errors with a problem-details document
//! (`name`, `title`, `detail`, `errorDetails`); the `name` is kept as the
//! error code so callers can tell genuine absence from indexing lag.

use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorContext, ServiceError};

/// Extract a human readable message from a problem-details body
fn problem_message(json: &Value) -> Option<&str> {
    json.get("title")
        .or_else(|| json.get("detail"))
        .or_else(|| json.get("message"))
        .or_else(|| json.get("error"))
        .and_then(|m| m.as_str())
}

/// Map an HTTP error status and body to a ServiceError
///
/// `definitive_not_found` lists the remote error names which mean the
/// identifier itself is unknown. Any other 404 is treated as indexing lag.
pub fn map_http_error(
    status: StatusCode,
    body: &str,
    context: &mut ErrorContext,
    definitive_not_found: &[String],
) -> ServiceError {
    let json = serde_json::from_str::<Value>(body).ok();

    let name = json
        .as_ref()
        .and_then(|j| j.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string);

    if let Some(ref name) = name {
        context.error_code = Some(name.clone());
    }

    let message = match json.as_ref().and_then(problem_message) {
        Some(message) => message.to_string(),
        None if body.is_empty() => status.to_string(),
        None if body.len() > 100 => format!("{}: {:.100}...", status, body),
        None => format!("{}: {}", status, body),
    };

    match status {
        StatusCode::UNAUTHORIZED => ServiceError::authentication(message),
        StatusCode::FORBIDDEN => ServiceError::authorization(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::rate_limit(message),
        StatusCode::REQUEST_TIMEOUT => ServiceError::timeout(message),
        StatusCode::NOT_FOUND => {
            let definitive = name
                .as_deref()
                .map(|n| definitive_not_found.iter().any(|d| d == n))
                .unwrap_or(false);

            if definitive {
                ServiceError::not_found(message)
            } else {
                ServiceError::not_yet_indexed(message)
            }
        }
        s if s.is_client_error() => ServiceError::validation(message),
        _ => ServiceError::service(message),
    }
}

/// Helper function to classify HTTP errors by category
pub fn classify_http_error(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "validation",
        401 => "authentication",
        403 => "authorization",
        404 => "not_found",
        408 => "timeout",
        429 => "rate_limit",
        500..=599 => "server",
        _ => "unknown",
    }
}

/// Whether a recorded HTTP status denotes a client error (4xx)
pub fn is_client_error_status(status: u16) -> bool {
    (400..500).contains(&status)
}
