//! Utility module for common functionality
//!
//! This module provides common utility functions used across the Insights SDK.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

/// Async timing helper
pub async fn measure_time_async<F, T, Fut>(f: F) -> (T, Duration)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f().await;
    let duration = start.elapsed();
    (result, duration)
}

/// Truncate a string to a maximum number of characters, adding ellipsis if truncated
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

static SENSITIVE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Bearer [A-Za-z0-9\-_\.]+", "Bearer [REDACTED]"),
        (r#"(?i)"?api[_-]?key"?\s*[=:]\s*"?[A-Za-z0-9\-_]+"?"#, "api_key=[REDACTED]"),
        (r#"(?i)"?password"?\s*[=:]\s*"?[^\s&",]+"?"#, "password=[REDACTED]"),
        (r#"(?i)"?secret"?\s*[=:]\s*"?[^\s&",]+"?"#, "secret=[REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
    .collect()
});

/// Sanitize a string for logging (remove sensitive data patterns)
pub fn sanitize_for_logging(s: &str) -> String {
    let mut result = s.to_string();
    for (re, replacement) in SENSITIVE_PATTERNS.iter() {
        result = re.replace_all(&result, *replacement).to_string();
    }
    result
}

/// Parse a duration from a string (e.g., "30s", "5m", "1h")
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim().to_lowercase();

    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else if let Some(hours) = s.strip_suffix('h') {
        hours.trim().parse::<u64>().ok().map(|h| Duration::from_secs(h * 3600))
    } else {
        // Bare number of seconds
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("hi", 2), "hi");
        assert_eq!(truncate_string("ééééé", 4), "é...");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_duration("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_duration("100ms"), Some(Duration::from_millis(100)));
        assert_eq!(parse_duration("60"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn test_sanitize_for_logging() {
        let input = "Authorization: Bearer abc123xyz";
        let output = sanitize_for_logging(input);
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("abc123xyz"));

        let body = r#"{"password": "hunter2", "portfolio": "UK-EQ"}"#;
        let output = sanitize_for_logging(body);
        assert!(!output.contains("hunter2"));
        assert!(output.contains("UK-EQ"));
    }
}
