//! Insights API client implementation
//!
//! HTTP client for the platform's request log: searching logged calls with a
//! filter expression, and fetching the captured request and response of a
//! single logged call.

mod models;
pub use models::*;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::{ConfigProvider, InsightsConfig, ServiceConfig, DEFAULT_PROVIDER};
use crate::core::{ClientBuilder, LogStore, ServiceClient};
use crate::error::{ErrorContext, Result, ServiceError};
use crate::query::LogQuery;
use crate::services::common::{parse_error_response, ClientMetrics, UserAgent};
use crate::util::{measure_time_async, sanitize_for_logging, truncate_string};

const SERVICE_NAME: &str = "insights";

/// Remote error name returned when a request log id is unknown
pub const REQUEST_NOT_FOUND: &str = "RequestNotFound";

/// Page size requested from the log search endpoint
const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Upper bound on followed continuation tokens per search
const MAX_PAGES: usize = 50;

/// Insights API client
pub struct InsightsClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: InsightsConfig,

    /// Normalized base URL
    base_url: Url,

    /// Remote error names that mean an id is unknown rather than pending
    definitive_not_found: Vec<String>,

    /// Page size for log searches
    page_limit: u32,

    /// Client metrics
    metrics: ClientMetrics,
}

impl InsightsClient {
    /// Create a client from `INSIGHTS_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new_with_config(InsightsConfig::from_provider(&**DEFAULT_PROVIDER)?)
    }

    /// Create a new client with custom configuration
    pub fn new_with_config(config: InsightsConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = ClientBuilder::new()
            .base_url(config.base_url.clone())
            .auth_token(config.api_token.clone())
            .auth_type("Bearer")
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(UserAgent {
                extra: Some("insights-client".to_string()),
                ..UserAgent::default()
            }.to_string());

        if let Some(ref id) = config.correlation_id {
            builder = builder.correlation_id(id);
        }

        let base_url = Url::parse(&builder.configured_base_url()?)
            .map_err(|e| ServiceError::configuration(format!("Invalid base URL: {}", e)))?;
        let http_client = builder.build_http_client()?;

        Ok(Self {
            http_client,
            config,
            base_url,
            definitive_not_found: vec![REQUEST_NOT_FOUND.to_string()],
            page_limit: DEFAULT_PAGE_LIMIT,
            metrics: ClientMetrics::default(),
        })
    }

    /// Create a new builder for the insights client
    pub fn builder() -> InsightsClientBuilder {
        InsightsClientBuilder::default()
    }

    /// Remote error names treated as genuine absence
    pub fn definitive_not_found(&self) -> &[String] {
        &self.definitive_not_found
    }

    /// Search the request log with a raw filter expression, following continuation pages
    pub async fn list_request_logs(&self, filter: &str) -> Result<Vec<LogEntry>> {
        let url = self.endpoint(&["api", "requests"])?;
        let limit = self.page_limit.to_string();

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut params = vec![("filter", filter.to_string()), ("limit", limit.clone())];
            if let Some(token) = page_token.take() {
                params.push(("page", token));
            }

            let page: RequestLogPage = self.get_json("list_request_logs", url.clone(), &params).await?;
            entries.extend(page.values);

            match page.next_page {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(entries),
            }
        }

        warn!("Stopped following request log pages after {} pages", MAX_PAGES);
        Ok(entries)
    }

    /// Fetch the captured request of a logged call
    pub async fn get_request(&self, log_id: &str) -> Result<HttpRecord> {
        let url = self.endpoint(&["api", "requests", log_id, "request"])?;
        self.get_json("get_request", url, &[]).await
    }

    /// Fetch the captured response of a logged call
    pub async fn get_response(&self, log_id: &str) -> Result<HttpRecord> {
        let url = self.endpoint(&["api", "requests", log_id, "response"])?;
        self.get_json("get_response", url, &[]).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::configuration(format!("Base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<R>(&self, endpoint: &str, url: Url, params: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        debug!("Sending request to insights: GET {}", url);

        let (result, duration) = measure_time_async(|| self.send_get::<R>(endpoint, url, params)).await;

        match &result {
            Ok(_) => self.metrics.record_success(duration),
            Err(err) => self.metrics.record_error(duration, err),
        }

        result
    }

    async fn send_get<R>(&self, endpoint: &str, url: Url, params: &[(&str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let response = self.http_client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| ServiceError::from(e).with_context(ErrorContext::for_service(SERVICE_NAME).endpoint(endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(parse_error_response(SERVICE_NAME, endpoint, response, &self.definitive_not_found).await);
        }

        let body = response.text().await
            .map_err(|e| ServiceError::network(format!("Failed to read response body: {}", e)))?;

        debug!("insights {} -> {}: {}", endpoint, status, truncate_string(&sanitize_for_logging(&body), 200));

        serde_json::from_str::<R>(&body)
            .map_err(|e| ServiceError::parsing(format!("Failed to parse {} response: {}", endpoint, e))
                .with_context(ErrorContext::for_service(SERVICE_NAME).endpoint(endpoint).status_code(status.as_u16())))
    }
}

#[async_trait]
impl LogStore for InsightsClient {
    async fn list_logs(&self, query: &LogQuery) -> Result<Vec<LogEntry>> {
        self.list_request_logs(&query.to_filter()).await
    }

    async fn request_body(&self, log_id: &str) -> Result<Value> {
        Ok(self.get_request(log_id).await?.json_body())
    }

    async fn response_body(&self, log_id: &str) -> Result<Value> {
        Ok(self.get_response(log_id).await?.json_body())
    }
}

#[async_trait]
impl ServiceClient for InsightsClient {
    fn name(&self) -> &str {
        SERVICE_NAME
    }

    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn version(&self) -> &str {
        "v1"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = self.endpoint(&["api", "requests"])?;
        match self.get_json::<RequestLogPage>("health_check", url, &[("limit", "1".to_string())]).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Insights health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn metrics(&self) -> Option<HashMap<String, String>> {
        Some(self.metrics.as_map())
    }
}

/// Builder for the insights client
#[derive(Default)]
pub struct InsightsClientBuilder {
    /// Bearer token
    api_token: Option<String>,

    /// Base URL for the API
    base_url: Option<String>,

    /// Request timeout
    timeout_seconds: Option<u64>,

    /// Correlation id for the client's own requests
    correlation_id: Option<crate::correlation::CorrelationId>,

    /// Extra remote error names meaning "unknown id"
    definitive_not_found: Vec<String>,

    /// Page size for searches
    page_limit: Option<u32>,
}

impl InsightsClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API token
    pub fn api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    /// Set the base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the timeout in seconds
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Tag the client's own requests with a correlation id
    pub fn correlation_id(mut self, id: &crate::correlation::CorrelationId) -> Self {
        self.correlation_id = Some(id.clone());
        self
    }

    /// Treat 404s carrying this remote error name as genuine absence
    pub fn definitive_not_found(mut self, name: impl Into<String>) -> Self {
        self.definitive_not_found.push(name.into());
        self
    }

    /// Set the page size for log searches
    pub fn page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Build the insights client over `INSIGHTS_*` environment settings
    pub fn build(self) -> Result<InsightsClient> {
        self.build_with_provider(&**DEFAULT_PROVIDER)
    }

    /// Build the insights client, taking unset fields from `provider`
    ///
    /// Keys the provider does not set keep their defaults; invalid values
    /// are reported rather than discarded.
    pub fn build_with_provider<P: ConfigProvider + ?Sized>(self, provider: &P) -> Result<InsightsClient> {
        let mut config = InsightsConfig::layered(provider)?;

        if let Some(api_token) = self.api_token {
            config.api_token = api_token;
        }

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }

        if let Some(timeout) = self.timeout_seconds {
            config.timeout_seconds = timeout;
        }

        if self.correlation_id.is_some() {
            config.correlation_id = self.correlation_id;
        }

        let mut client = InsightsClient::new_with_config(config)?;
        client.definitive_not_found.extend(self.definitive_not_found);

        if let Some(limit) = self.page_limit {
            if limit == 0 {
                return Err(ServiceError::configuration("page limit must be at least 1"));
            }
            client.page_limit = limit;
        }

        Ok(client)
    }
}
