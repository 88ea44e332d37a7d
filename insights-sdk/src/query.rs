//! Log queries against the remote log store

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationId;
use crate::error::{Result, ServiceError};

/// Immutable description of which log entries to look for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    operation: String,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    correlation_id: CorrelationId,
}

impl LogQuery {
    /// Build a query for `operation` calls tagged with `correlation_id` in `[from, to]`
    pub fn new(
        operation: impl Into<String>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        correlation_id: CorrelationId,
    ) -> Result<Self> {
        let operation = operation.into();

        if operation.trim().is_empty() {
            return Err(ServiceError::validation("operation name must not be empty"));
        }

        if from > to {
            return Err(ServiceError::validation(format!(
                "time window is inverted: {} > {}",
                from, to
            )));
        }

        Ok(Self {
            operation,
            from,
            to,
            correlation_id,
        })
    }

    /// Query covering the last `lookback` up to now
    pub fn within_last(
        operation: impl Into<String>,
        lookback: Duration,
        correlation_id: CorrelationId,
    ) -> Result<Self> {
        let lookback = chrono::Duration::from_std(lookback)
            .map_err(|e| ServiceError::validation(format!("lookback out of range: {}", e)))?;
        let to = Utc::now();
        Self::new(operation, to - lookback, to, correlation_id)
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Render the conjunctive filter expression understood by the log search endpoint
    pub fn to_filter(&self) -> String {
        format!(
            "timestamp gt {} and timestamp lt {} and operation eq {} and correlationId eq {}",
            self.from.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.to.to_rfc3339_opts(SecondsFormat::Millis, true),
            quote(&self.operation),
            quote(self.correlation_id.as_str()),
        )
    }
}

/// Quote a string literal, doubling embedded single quotes
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_filter_expression() {
        let (from, to) = window();
        let query = LogQuery::new("GetValuation", from, to, CorrelationId::parse("C1").unwrap()).unwrap();

        assert_eq!(
            query.to_filter(),
            "timestamp gt 2024-03-01T10:00:00.000Z and timestamp lt 2024-03-01T11:00:00.000Z \
             and operation eq 'GetValuation' and correlationId eq 'C1'"
        );
    }

    #[test]
    fn test_quotes_are_escaped() {
        let (from, to) = window();
        let query = LogQuery::new("O'Brien", from, to, CorrelationId::parse("a'b").unwrap()).unwrap();
        let filter = query.to_filter();
        assert!(filter.contains("operation eq 'O''Brien'"));
        assert!(filter.contains("correlationId eq 'a''b'"));
    }

    #[test]
    fn test_rejects_inverted_window_and_blank_operation() {
        let (from, to) = window();
        assert!(LogQuery::new("GetValuation", to, from, CorrelationId::new()).is_err());
        assert!(LogQuery::new(" ", from, to, CorrelationId::new()).is_err());
    }

    #[test]
    fn test_within_last() {
        let query = LogQuery::within_last("GetValuation", Duration::from_secs(600), CorrelationId::new()).unwrap();
        assert_eq!((query.to() - query.from()).num_seconds(), 600);
    }
}
