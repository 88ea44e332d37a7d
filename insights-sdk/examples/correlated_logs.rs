//! Correlated Log Retrieval Example
//!
//! This example waits for the calls tagged with one correlation id to be
//! indexed, then prints them as a table.
//!
//! To run this example:
//! ```
//! INSIGHTS_API_TOKEN=your_token INSIGHTS_BASE_URL=https://your-domain/insights \
//!     cargo run --example correlated_logs -- <correlation-id> [operation] [expected-count]
//! ```

use std::time::Duration;

use anyhow::{bail, Context};
use insights_sdk::{report, retriever_from_env, CorrelationId, LogQuery};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let mut args = std::env::args().skip(1);
    let Some(correlation_id) = args.next() else {
        bail!("usage: correlated_logs <correlation-id> [operation] [expected-count]");
    };
    let correlation_id = CorrelationId::parse(correlation_id)?;
    let operation = args.next().unwrap_or_else(|| "GetValuation".to_string());
    let expected: usize = args
        .next()
        .map(|n| n.parse())
        .transpose()
        .context("expected-count must be a non-negative integer")?
        .unwrap_or(1);

    println!("Retrieving {} x {} for correlation id {}", expected, operation, correlation_id);

    let retriever = retriever_from_env().context("Please set INSIGHTS_API_TOKEN (and INSIGHTS_BASE_URL)")?;
    let query = LogQuery::within_last(operation, Duration::from_secs(3600), correlation_id)?;
    let max_attempts = retriever.config().retry.max_attempts;

    let records = retriever.retrieve(&query, expected, max_attempts).await?;

    println!("{}", report::render_table(&records));

    let failed = records.iter().filter(|r| r.is_client_error()).count();
    println!("\n{} records, {} client errors", records.len(), failed);

    Ok(())
}
