//! Resilience patterns for insights retrieval
//!
//! This module provides:
//! - Attempt-bounded retry and polling with exponential backoff
//! - A wall-clock deadline wrapper for callers that need one

mod retry;

pub use retry::{Attempted, RetryConfig, RetryExecutor, RetryFailure};

use std::future::Future;
use std::time::Duration;

use crate::error::{Result, ServiceError};

/// Run `operation` under an optional wall-clock deadline
///
/// When the deadline elapses the operation is dropped mid-flight and a
/// `Timeout` error is returned.
pub async fn with_deadline<Fut, T>(deadline: Option<Duration>, operation: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, operation)
            .await
            .map_err(|_| ServiceError::timeout(format!("deadline of {:?} elapsed", limit)))?,
        None => operation.await,
    }
}
