//! Basic Usage Example
//!
//! Lists databases, creates a table and runs a text generation with the async
//! client. Set `DATAAPI_API_KEY` (and optionally `DATAAPI_BASE_URL`) first.
//!
//! Run with: cargo run --example basic_usage

use dataapi::types::{ColumnDefinition, ColumnType, GenerationParams, QueryOptions, SortOrder};
use dataapi::{Client, ErrorKind};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("dataapi=debug")
        .init();

    let client = Client::from_env()?;
    let session = client.session();

    let health = session.health_check().await?;
    println!("API health: {}", health);

    let options = QueryOptions::builder()
        .per_page(5)
        .sort("created_at", SortOrder::Desc)
        .build()?;
    let databases = session.databases().list_databases(Some(&options)).await?;
    println!(
        "{} databases (page {} of {})",
        databases.pagination.total, databases.pagination.page, databases.pagination.total_pages
    );

    if let Some(db) = databases.data.first() {
        let schema = [
            ColumnDefinition::new("id", ColumnType::String).primary_key(),
            ColumnDefinition::new("amount", ColumnType::Float).required(),
        ];
        match session
            .databases()
            .create_table(&db.id, "orders", &schema, Some("Demo table"))
            .await
        {
            Ok(table) => println!("created table {} in {}", table.id, db.name),
            Err(e) if e.kind() == ErrorKind::Conflict => println!("table already exists: {}", e),
            Err(e) => return Err(e.into()),
        }
    }

    let params = GenerationParams::default().max_tokens(64).temperature(0.2);
    match session
        .ai()
        .generate_text("gpt-4", "Describe DataAPI in one sentence.", &params)
        .await
    {
        Ok(reply) => println!("{} ({} tokens)", reply.response, reply.tokens_used),
        Err(e) if e.is_retryable() => println!("gave up after retries: {}", e),
        Err(e) => println!("generation failed: {}", e.to_json()),
    }

    Ok(())
}
