//! Blocking Usage Example
//!
//! Same pipeline from synchronous code: no async runtime required.
//!
//! Run with: DATAAPI_API_KEY=... cargo run --example blocking_usage

use dataapi::types::{ExecutionFilter, WorkflowStatus};
use dataapi::{BlockingClient, ClientConfig};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("dataapi=info")
        .init();

    let api_key = std::env::var("DATAAPI_API_KEY")?;
    let config = ClientConfig::builder()
        .timeout(Duration::from_secs(10))
        .max_retries(2)
        .build()?;
    let client = BlockingClient::with_api_key(api_key, config)?;

    let user = client.user_info()?;
    println!("signed in as {}", user["email"]);

    let filter = ExecutionFilter {
        status: Some(WorkflowStatus::Failed),
        ..Default::default()
    };
    let failed = client.workflows().list_executions(&filter, None)?;
    for execution in &failed.data {
        println!(
            "{} ({}) failed: {}",
            execution.id,
            execution.workflow_id,
            execution.error_message.as_deref().unwrap_or("no message")
        );
        let retried = client.workflows().retry_execution(&execution.id, None)?;
        println!("  retried as {} [{}]", retried.id, retried.status.as_str());
    }

    client.close();
    Ok(())
}
