//! Shared fixtures: a scripted in-memory log store and sample data

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use crate::config::RetrieverConfig;
use crate::core::LogStore;
use crate::correlation::CorrelationId;
use crate::error::{Result, ServiceError};
use crate::query::LogQuery;
use crate::resilience::RetryConfig;
use crate::services::insights::{LogEntry, Outcome};

/// Log store whose indexing lag is scripted per call
#[derive(Default)]
pub struct ScriptedStore {
    /// Successive search results; the last one repeats once the script runs out
    searches: Vec<Vec<LogEntry>>,
    search_calls: AtomicU32,

    /// Per id: how many detail calls report "not yet indexed" before the bodies appear
    pending: HashMap<String, u32>,
    bodies: HashMap<String, (Value, Value)>,
    request_calls: Mutex<HashMap<String, u32>>,
    response_calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_results(mut self, results: Vec<Vec<LogEntry>>) -> Self {
        self.searches = results;
        self
    }

    pub fn detail(mut self, id: &str, pending_calls: u32, request: Value, response: Value) -> Self {
        self.pending.insert(id.to_string(), pending_calls);
        self.bodies.insert(id.to_string(), (request, response));
        self
    }

    pub fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn request_calls(&self, id: &str) -> u32 {
        self.request_calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    fn body(&self, calls: &Mutex<HashMap<String, u32>>, id: &str, pick: fn(&(Value, Value)) -> Value) -> Result<Value> {
        let call = {
            let mut calls = calls.lock().unwrap();
            let count = calls.entry(id.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let Some(bodies) = self.bodies.get(id) else {
            return Err(ServiceError::not_found(format!("unknown request log {}", id)));
        };

        if call <= self.pending.get(id).copied().unwrap_or(0) {
            return Err(ServiceError::not_yet_indexed(format!("{} not indexed yet", id)));
        }

        Ok(pick(bodies))
    }
}

#[async_trait]
impl LogStore for ScriptedStore {
    async fn list_logs(&self, _query: &LogQuery) -> Result<Vec<LogEntry>> {
        let call = self.search_calls.fetch_add(1, Ordering::SeqCst) as usize;
        let index = call.min(self.searches.len().saturating_sub(1));
        Ok(self.searches.get(index).cloned().unwrap_or_default())
    }

    async fn request_body(&self, log_id: &str) -> Result<Value> {
        self.body(&self.request_calls, log_id, |b| b.0.clone())
    }

    async fn response_body(&self, log_id: &str) -> Result<Value> {
        self.body(&self.response_calls, log_id, |b| b.1.clone())
    }
}

/// Retriever policy with millisecond backoff and no jitter
pub fn fast_config() -> RetrieverConfig {
    RetrieverConfig {
        retry: RetryConfig {
            max_attempts: 5,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(4),
            multiplier: 2.0,
            randomization_factor: 0.0,
        },
        detail_concurrency: 4,
        deadline: None,
    }
}

pub fn entry(id: &str, status_code: u16) -> LogEntry {
    LogEntry {
        id: id.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 15, 0).unwrap(),
        outcome: if status_code < 400 { Outcome::Success } else { Outcome::Failure },
        status_code,
        method: Some("POST".to_string()),
        url: Some("/api/aggregation/$valuation".to_string()),
        operation: Some("GetValuation".to_string()),
        duration: Some(120),
    }
}

pub fn query() -> LogQuery {
    LogQuery::new(
        "GetValuation",
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
        CorrelationId::parse("C1").unwrap(),
    )
    .unwrap()
}

pub fn valuation_request(instruments: Value) -> Value {
    json!({
        "recipeId": {"scope": "demo", "code": "valuation"},
        "metrics": [{"key": "Instrument/default/Name", "op": "Value"}],
        "valuationSchedule": {"effectiveAt": "2024-03-01T00:00:00Z"},
        "instruments": instruments
    })
}

pub fn valuation_response() -> Value {
    json!({"data": [{"Instrument/default/Name": "UK Gilt 2030", "Valuation/PV": 101.25}]})
}

pub fn invalid_instruments_response() -> Value {
    json!({
        "name": "InvalidParameterValue",
        "title": "One or more of the bits of input data provided were not valid.",
        "status": 400,
        "errorDetails": [{"parameterId": "instruments", "message": "must not be empty"}]
    })
}
