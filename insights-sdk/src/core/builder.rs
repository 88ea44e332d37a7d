//! Client builder implementation
//!
//! Builds `reqwest` clients whose every request carries the session's
//! correlation id, so the calls can later be found in the request log.

use std::time::Duration;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client as ReqwestClient;

use crate::correlation::{CorrelationId, CORRELATION_HEADER};
use crate::error::{Result, ServiceError};
use crate::services::UserAgent;

/// Unified client builder for platform clients
pub struct ClientBuilder {
    /// Base URL for the service
    base_url: Option<String>,

    /// Authentication token or key
    auth_token: Option<String>,

    /// Authentication type (Bearer, ApiKey, etc.)
    auth_type: Option<String>,

    /// Correlation id attached to every request
    correlation_id: Option<CorrelationId>,

    /// Request timeout
    timeout: Option<Duration>,

    /// User agent
    user_agent: Option<String>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            auth_token: None,
            auth_type: None,
            correlation_id: None,
            timeout: Some(Duration::from_secs(30)),
            user_agent: Some(UserAgent::default().to_string()),
        }
    }
}

impl ClientBuilder {
    /// Create a new client builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the service
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set authentication token/key
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set authentication type
    pub fn auth_type(mut self, auth_type: impl Into<String>) -> Self {
        self.auth_type = Some(auth_type.into());
        self
    }

    /// Tag every request with `id`
    pub fn correlation_id(mut self, id: &CorrelationId) -> Self {
        self.correlation_id = Some(id.clone());
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// The configured base URL, without a trailing slash
    pub fn configured_base_url(&self) -> Result<String> {
        let base = self.base_url.as_deref()
            .ok_or_else(|| ServiceError::configuration("Base URL is required"))?;

        url::Url::parse(base)
            .map_err(|e| ServiceError::configuration(format!("Invalid base URL {}: {}", base, e)))?;

        Ok(base.trim_end_matches('/').to_string())
    }

    /// Default headers sent with every request
    pub fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(ref id) = self.correlation_id {
            headers.insert(
                HeaderName::from_static("correlationid"),
                HeaderValue::from_str(id.as_str())
                    .map_err(|e| ServiceError::configuration(format!("Invalid {} header: {}", CORRELATION_HEADER, e)))?,
            );
        }

        if let Some(ref token) = self.auth_token {
            let auth_header_value = match self.auth_type.as_deref().unwrap_or("Bearer") {
                "Bearer" => format!("Bearer {}", token),
                "ApiKey" => token.clone(),
                other => format!("{} {}", other, token),
            };

            let mut value = HeaderValue::from_str(&auth_header_value)
                .map_err(|e| ServiceError::configuration(format!("Invalid auth header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Build an HTTP client with the configured settings
    pub fn build_http_client(&self) -> Result<ReqwestClient> {
        let mut builder = ReqwestClient::builder();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        builder = builder.gzip(true);
        builder = builder.default_headers(self.default_headers()?);

        builder.build()
            .map_err(|e| ServiceError::configuration(format!("Failed to build HTTP client: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_and_auth_headers() {
        let id = CorrelationId::parse("C1").unwrap();
        let headers = ClientBuilder::new()
            .auth_token("secret")
            .correlation_id(&id)
            .default_headers()
            .unwrap();

        assert_eq!(headers.get(CORRELATION_HEADER).unwrap(), "C1");
        assert_eq!(headers.get(reqwest::header::AUTHORIZATION).unwrap(), "Bearer secret");
    }

    #[test]
    fn test_base_url_required_and_normalized() {
        assert!(ClientBuilder::new().configured_base_url().is_err());
        assert!(ClientBuilder::new().base_url("not a url").configured_base_url().is_err());
        assert_eq!(
            ClientBuilder::new().base_url("http://localhost:8080/insights/").configured_base_url().unwrap(),
            "http://localhost:8080/insights"
        );
    }
}
