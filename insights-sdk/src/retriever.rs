//! Eventually-consistent log retrieval
//!
//! Log entries and their captured bodies are indexed asynchronously after
//! the originating call returns. The retriever polls the log store until the
//! expected number of entries is visible, then fetches each entry's detail
//! with its own retry loop.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use serde_json::Value;

use crate::assembler::{assemble, ResultRecord};
use crate::config::{RetrieverConfig, ServiceConfig};
use crate::core::LogStore;
use crate::error::{Result, ServiceError};
use crate::query::LogQuery;
use crate::resilience::{with_deadline, RetryExecutor, RetryFailure};
use crate::services::insights::LogEntry;

/// Log entries returned by [`LogRetriever::fetch_logs`]
#[derive(Debug, Clone, PartialEq)]
pub struct LogFetch {
    entries: Vec<LogEntry>,
    attempts: u32,
    expected: usize,
}

impl LogFetch {
    /// Whether at least the expected number of entries was seen
    ///
    /// A short result means the log store has not caught up yet, not that
    /// the missing entries do not exist.
    pub fn is_complete(&self) -> bool {
        self.entries.len() >= self.expected
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }

    /// Number of searches issued
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    /// The entries, or `IndexingTimeout` if fewer than expected were seen
    pub fn require_complete(self) -> Result<Vec<LogEntry>> {
        if self.is_complete() {
            Ok(self.entries)
        } else {
            Err(ServiceError::indexing_timeout(
                format!("found {} of {} expected log entries", self.entries.len(), self.expected),
                self.attempts,
            ))
        }
    }
}

/// Captured request and response bodies of one log entry
#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub request: Value,
    pub response: Value,

    /// Number of pair fetches issued
    pub attempts: u32,
}

/// Polls a [`LogStore`] until correlated calls become visible
pub struct LogRetriever<S> {
    store: S,
    config: RetrieverConfig,
}

impl<S: LogStore> LogRetriever<S> {
    /// Create a retriever with the default policy
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: RetrieverConfig::default(),
        }
    }

    /// Create a retriever with a custom policy
    pub fn with_config(store: S, config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Bound every public operation by a wall-clock deadline
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Search until at least `expected_minimum_count` distinct entries match `query`
    ///
    /// Returns the last result when `max_attempts` searches have been made,
    /// even if it is short. Search failures are returned immediately.
    #[tracing::instrument(skip_all, fields(operation = %query.operation(), expected = expected_minimum_count))]
    pub async fn fetch_logs(
        &self,
        query: &LogQuery,
        expected_minimum_count: usize,
        max_attempts: u32,
    ) -> Result<LogFetch> {
        with_deadline(
            self.config.deadline,
            self.poll_logs(query, expected_minimum_count, max_attempts),
        ).await
    }

    /// Fetch the request and response bodies of one log entry
    ///
    /// Both bodies are fetched again while either is still being indexed.
    /// Exhausting the budget yields `IndexingTimeout`; unknown ids and
    /// transport failures are returned as they occur.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_detail(&self, log_id: &str, max_attempts: u32) -> Result<Detail> {
        with_deadline(self.config.deadline, self.detail_pair(log_id, max_attempts)).await
    }

    /// Fetch details for every entry concurrently, in input order
    #[tracing::instrument(skip_all, fields(entries = entries.len()))]
    pub async fn fetch_details(&self, entries: &[LogEntry], max_attempts: u32) -> Result<Vec<Detail>> {
        with_deadline(self.config.deadline, self.detail_pairs(entries, max_attempts)).await
    }

    /// Fetch logs, wait for all of them, fetch their details and assemble result records
    #[tracing::instrument(skip_all, fields(operation = %query.operation(), expected = expected_count))]
    pub async fn retrieve(
        &self,
        query: &LogQuery,
        expected_count: usize,
        max_attempts: u32,
    ) -> Result<Vec<ResultRecord>> {
        with_deadline(self.config.deadline, async {
            let entries = self
                .poll_logs(query, expected_count, max_attempts)
                .await?
                .require_complete()?;

            let details = self.detail_pairs(&entries, max_attempts).await?;

            let records = entries
                .iter()
                .zip(details)
                .map(|(entry, detail)| assemble(entry, detail.request, detail.response))
                .collect::<Result<Vec<_>>>()?;

            info!(
                "Retrieved {} {} records for correlation id {}",
                records.len(),
                query.operation(),
                query.correlation_id()
            );
            Ok::<_, ServiceError>(records)
        }).await
    }

    async fn poll_logs(
        &self,
        query: &LogQuery,
        expected_minimum_count: usize,
        max_attempts: u32,
    ) -> Result<LogFetch> {
        let executor = RetryExecutor::new(self.config.retry.with_max_attempts(max_attempts));
        let store = &self.store;

        let polled = executor
            .poll_until(
                move || async move {
                    let entries = dedupe_by_id(store.list_logs(query).await?);
                    debug!("Log search returned {} distinct entries", entries.len());
                    Ok::<_, ServiceError>(entries)
                },
                |entries: &Vec<LogEntry>| entries.len() >= expected_minimum_count,
            )
            .await?;

        if !polled.satisfied {
            warn!(
                "Only {} of {} log entries visible after {} attempts",
                polled.value.len(),
                expected_minimum_count,
                polled.attempts
            );
        }

        Ok(LogFetch {
            entries: polled.value,
            attempts: polled.attempts,
            expected: expected_minimum_count,
        })
    }

    async fn detail_pair(&self, log_id: &str, max_attempts: u32) -> Result<Detail> {
        if log_id.trim().is_empty() {
            return Err(ServiceError::validation("log entry id must not be empty"));
        }

        let executor = RetryExecutor::new(self.config.retry.with_max_attempts(max_attempts));
        let store = &self.store;

        let result = executor
            .retry_if(
                move || async move {
                    // Both halves complete on every attempt so each is polled once per attempt
                    let (request, response) = tokio::join!(store.request_body(log_id), store.response_body(log_id));
                    combine_halves(request, response)
                },
                ServiceError::is_not_yet_indexed,
            )
            .await;

        match result {
            Ok(fetched) => {
                let (request, response) = fetched.value;
                Ok(Detail {
                    request,
                    response,
                    attempts: fetched.attempts,
                })
            }
            Err(RetryFailure::Exhausted { error, attempts }) => {
                warn!("Detail for {} still not indexed after {} attempts: {}", log_id, attempts, error);
                Err(ServiceError::detail_not_indexed(log_id, attempts))
            }
            Err(failure) => Err(failure.into_error()),
        }
    }

    async fn detail_pairs(&self, entries: &[LogEntry], max_attempts: u32) -> Result<Vec<Detail>> {
        stream::iter(entries)
            .map(|entry| self.detail_pair(&entry.id, max_attempts))
            .buffered(self.config.detail_concurrency)
            .try_collect()
            .await
    }
}

/// Join the two detail halves, preferring an error that indexing lag cannot explain
fn combine_halves(request: Result<Value>, response: Result<Value>) -> Result<(Value, Value)> {
    match (request, response) {
        (Ok(request), Ok(response)) => Ok((request, response)),
        (Err(e), _) | (_, Err(e)) if !e.is_not_yet_indexed() => Err(e),
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

/// Drop repeated ids, keeping the first occurrence and the store's order
fn dedupe_by_id(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.id.clone()))
        .collect()
}
