//! Error handling for the Insights SDK
//!
//! This module provides the error system shared by the transport, retrieval
//! and assembly layers:
//! - Separates transport failures from indexing lag and genuine absence
//! - Adds context (service, status code, remote error name) to errors
//! - Maps HTTP error responses to normalized variants
//! - Provides a convenient Result type alias

use std::fmt;
use std::collections::HashMap;
use thiserror::Error;

pub mod mapping;

/// Result type for Insights SDK operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Main error type for the Insights SDK
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Authorization errors (permission issues)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Remote service errors (5xx)
    #[error("Service error: {0}")]
    Service(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Request timeouts and elapsed deadlines
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// The identifier does not correspond to any known record
    #[error("Not found: {0}")]
    NotFound(String),

    /// The record is known to exist but has not been indexed yet
    #[error("Not yet indexed: {0}")]
    NotYetIndexed(String),

    /// The retry budget ran out while waiting for indexing to catch up
    #[error("Indexing timeout after {attempts} attempts: {message}")]
    IndexingTimeout {
        message: String,
        attempts: u32,
    },

    /// A response claimed a client error but lacked the structured error fields
    #[error("Malformed error body: {0}")]
    MalformedErrorBody(String),

    /// Errors with additional context
    #[error("{inner}")]
    WithContext {
        inner: Box<ServiceError>,
        context: ErrorContext,
    },
}

/// Caller-facing classification of a [`ServiceError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network or service-level failure unrelated to indexing lag
    TransportFailure,

    /// Retry budget exhausted while waiting for indexing
    IndexingTimeout,

    /// The identifier is genuinely unknown
    NotFound,

    /// An error status without a parseable error body
    MalformedErrorBody,

    /// Anything else (configuration, validation, parsing, ...)
    Other,
}

impl ServiceError {
    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        ServiceError::Authentication(message.into())
    }

    /// Create an authorization error
    pub fn authorization(message: impl Into<String>) -> Self {
        ServiceError::Authorization(message.into())
    }

    /// Create a rate limit error
    pub fn rate_limit(message: impl Into<String>) -> Self {
        ServiceError::RateLimit(message.into())
    }

    /// Create a remote service error
    pub fn service(message: impl Into<String>) -> Self {
        ServiceError::Service(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    /// Create a parsing error
    pub fn parsing(message: impl Into<String>) -> Self {
        ServiceError::Parsing(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        ServiceError::Configuration(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Create a not-yet-indexed error
    pub fn not_yet_indexed(message: impl Into<String>) -> Self {
        ServiceError::NotYetIndexed(message.into())
    }

    /// Create an indexing timeout error
    pub fn indexing_timeout(message: impl Into<String>, attempts: u32) -> Self {
        ServiceError::IndexingTimeout {
            message: message.into(),
            attempts,
        }
    }

    /// Detail bodies for `log_id` were still missing when the budget ran out
    pub fn detail_not_indexed(log_id: &str, attempts: u32) -> Self {
        Self::indexing_timeout(format!("request/response detail for log entry {}", log_id), attempts)
            .with_context(ErrorContext::for_service("insights").with("log_id", log_id))
    }

    /// Create a malformed error body error
    pub fn malformed_error_body(message: impl Into<String>) -> Self {
        ServiceError::MalformedErrorBody(message.into())
    }

    /// Add context to an existing error
    pub fn with_context(self, context: ErrorContext) -> Self {
        ServiceError::WithContext {
            inner: Box::new(self),
            context,
        }
    }

    /// The innermost error, with any context wrappers removed
    pub fn root(&self) -> &ServiceError {
        match self {
            ServiceError::WithContext { inner, .. } => inner.root(),
            other => other,
        }
    }

    /// Get the error code if available
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { inner, context } => {
                context.error_code.as_deref().or_else(|| inner.error_code())
            }
            _ => None,
        }
    }

    /// Get the service name if available
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ServiceError::WithContext { context, .. } => Some(&context.service),
            _ => None,
        }
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ServiceError::WithContext { inner, context } => {
                context.status_code.or_else(|| inner.status_code())
            }
            _ => None,
        }
    }

    /// Classify this error into one of the caller-facing kinds
    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            ServiceError::Network(_)
            | ServiceError::Authentication(_)
            | ServiceError::Authorization(_)
            | ServiceError::RateLimit(_)
            | ServiceError::Service(_)
            | ServiceError::Timeout(_) => ErrorKind::TransportFailure,
            ServiceError::IndexingTimeout { .. } => ErrorKind::IndexingTimeout,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::MalformedErrorBody(_) => ErrorKind::MalformedErrorBody,
            _ => ErrorKind::Other,
        }
    }

    /// Check if this is a network/service-level failure
    pub fn is_transport_failure(&self) -> bool {
        self.kind() == ErrorKind::TransportFailure
    }

    /// Check if this error only reflects indexing lag on the remote side
    pub fn is_not_yet_indexed(&self) -> bool {
        matches!(self.root(), ServiceError::NotYetIndexed(_))
    }
}

/// Error context information
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Service that generated the error
    pub service: String,

    /// Request timestamp
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,

    /// HTTP status code if applicable
    pub status_code: Option<u16>,

    /// Remote error name (e.g. `RequestNotFound`)
    pub error_code: Option<String>,

    /// Endpoint that was called
    pub endpoint: Option<String>,

    /// Additional context data
    pub data: HashMap<String, String>,
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self {
            service: "unknown".to_string(),
            timestamp: Some(chrono::Utc::now()),
            status_code: None,
            error_code: None,
            endpoint: None,
            data: HashMap::new(),
        }
    }
}

impl ErrorContext {
    /// Create a new error context for a specific service
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            ..Self::default()
        }
    }

    /// Add an HTTP status code
    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    /// Add an error code
    pub fn error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Add an endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add a context value
    pub fn add<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.data.insert(key.into(), value.to_string());
    }

    /// Add a context value and return self (builder pattern)
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: fmt::Display,
    {
        self.add(key, value);
        self
    }
}

/// Convert reqwest errors to ServiceError
impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        let context = ErrorContext::for_service("http_client");

        let service_error = if err.is_timeout() {
            ServiceError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            ServiceError::network(format!("Connection error: {}", err))
        } else if err.is_request() {
            ServiceError::network(format!("Request failed: {}", err))
        } else if err.is_redirect() {
            ServiceError::network(format!("Too many redirects: {}", err))
        } else if err.is_decode() {
            ServiceError::parsing(format!("Response decode error: {}", err))
        } else {
            ServiceError::internal(format!("HTTP client error: {}", err))
        };

        if let Some(status) = err.status() {
            service_error.with_context(context.status_code(status.as_u16()))
        } else {
            service_error.with_context(context)
        }
    }
}

/// Convert serde_json errors to ServiceError
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::parsing(format!("JSON error: {}", err))
            .with_context(ErrorContext::for_service("json"))
    }
}
