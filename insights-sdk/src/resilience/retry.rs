//! Attempt-bounded retry with exponential backoff
//!
//! Two composable loops share one policy:
//! - `poll_until` repeats a successful call until its value satisfies a
//!   predicate, returning the last value when the budget runs out
//! - `retry_if` repeats a failing call while a classifier accepts the error
//!
//! Errors the loop was not asked to absorb propagate on the attempt that
//! produced them.

use std::future::Future;
use std::time::Duration;
use backoff::{ExponentialBackoff, backoff::Backoff};
use std::fmt;

use crate::error::{Result, ServiceError};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_interval: Duration,

    /// Upper bound on any single delay
    pub max_interval: Duration,

    /// Multiplier applied to the delay after each attempt
    pub multiplier: f64,

    /// Jitter as a fraction of the current delay (0.0 disables it)
    pub randomization_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            randomization_factor: 0.2,
        }
    }
}

impl fmt::Display for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RetryConfig {{ max_attempts: {}, initial_interval: {:?}, max_interval: {:?}, multiplier: {}, randomization_factor: {} }}",
            self.max_attempts,
            self.initial_interval,
            self.max_interval,
            self.multiplier,
            self.randomization_factor,
        )
    }
}

impl RetryConfig {
    /// Same policy with a different attempt ceiling
    pub fn with_max_attempts(&self, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..self.clone()
        }
    }

    /// Check the policy is usable
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ServiceError::validation("max_attempts must be at least 1"));
        }

        if self.multiplier < 1.0 {
            return Err(ServiceError::configuration(format!(
                "backoff multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }

        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(ServiceError::configuration(format!(
                "randomization factor must be within [0, 1], got {}",
                self.randomization_factor
            )));
        }

        Ok(())
    }

    /// Delay generator for one retry loop
    pub fn backoff(&self) -> ExponentialBackoff {
        let mut backoff = ExponentialBackoff {
            current_interval: self.initial_interval,
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            randomization_factor: self.randomization_factor,
            // The attempt ceiling bounds the loop, not elapsed time
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        backoff.reset();
        backoff
    }
}

/// A value produced by a retry loop together with the attempts it took
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    /// The produced value
    pub value: T,

    /// Number of calls made
    pub attempts: u32,

    /// Whether the loop's stop condition was met (always true for `retry_if`)
    pub satisfied: bool,
}

/// Why `retry_if` gave up
#[derive(Debug)]
pub enum RetryFailure {
    /// The classifier rejected the error; it is returned unchanged
    Permanent { error: ServiceError, attempts: u32 },

    /// Every attempt failed with a retryable error
    Exhausted { error: ServiceError, attempts: u32 },
}

impl RetryFailure {
    /// Number of calls made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryFailure::Permanent { attempts, .. } | RetryFailure::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The last error observed
    pub fn into_error(self) -> ServiceError {
        match self {
            RetryFailure::Permanent { error, .. } | RetryFailure::Exhausted { error, .. } => error,
        }
    }
}

/// Executor for retry operations with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    /// Retry configuration
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor with the specified configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Call `operation` until `satisfied` accepts its value or the budget runs out
    ///
    /// Errors returned by `operation` are not retried.
    pub async fn poll_until<F, Fut, T, P>(&self, mut operation: F, satisfied: P) -> Result<Attempted<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&T) -> bool,
    {
        self.config.validate()?;

        let mut backoff = self.config.backoff();
        let mut attempts = 0;

        loop {
            let value = operation().await?;
            attempts += 1;

            if satisfied(&value) {
                return Ok(Attempted { value, attempts, satisfied: true });
            }

            if attempts >= self.config.max_attempts {
                log::debug!("Poll budget of {} attempts exhausted", self.config.max_attempts);
                return Ok(Attempted { value, attempts, satisfied: false });
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    log::warn!(
                        "Poll condition not met, retrying in {:?} (attempt {}/{})",
                        delay,
                        attempts,
                        self.config.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Ok(Attempted { value, attempts, satisfied: false }),
            }
        }
    }

    /// Call `operation` until it succeeds, retrying while `should_retry` accepts the error
    pub async fn retry_if<F, Fut, T, C>(&self, mut operation: F, should_retry: C) -> std::result::Result<Attempted<T>, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&ServiceError) -> bool,
    {
        if let Err(error) = self.config.validate() {
            return Err(RetryFailure::Permanent { error, attempts: 0 });
        }

        let mut backoff = self.config.backoff();
        let mut attempts = 0;

        loop {
            let result = operation().await;
            attempts += 1;

            let err = match result {
                Ok(value) => return Ok(Attempted { value, attempts, satisfied: true }),
                Err(err) => err,
            };

            if !should_retry(&err) {
                return Err(RetryFailure::Permanent { error: err, attempts });
            }

            if attempts >= self.config.max_attempts {
                return Err(RetryFailure::Exhausted { error: err, attempts });
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    log::warn!(
                        "Operation failed with retryable error, retrying in {:?} (attempt {}/{}): {}",
                        delay,
                        attempts,
                        self.config.max_attempts,
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
                None => return Err(RetryFailure::Exhausted { error: err, attempts }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2.0,
            randomization_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn test_poll_satisfied_first_attempt() {
        let retry = RetryExecutor::new(fast(3));
        let result = retry.poll_until(|| async { Ok(5) }, |v| *v >= 5).await.unwrap();
        assert_eq!(result.value, 5);
        assert_eq!(result.attempts, 1);
        assert!(result.satisfied);
    }

    #[tokio::test]
    async fn test_retry_if_permanent_error_stops() {
        let calls = AtomicU32::new(0);
        let retry = RetryExecutor::new(fast(5));

        let result = retry.retry_if(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ServiceError::validation("bad")) }
            },
            |e| e.is_not_yet_indexed(),
        ).await;

        assert!(matches!(result, Err(RetryFailure::Permanent { attempts: 1, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles_without_jitter() {
        let config = RetryConfig {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(10),
            randomization_factor: 0.0,
            ..RetryConfig::default()
        };
        let mut backoff = config.backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(400)));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(fast(0).validate().is_err());
    }
}
