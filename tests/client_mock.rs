//! End-to-end façade calls over the reqwest transport against a mock server.

mod support;

use dataapi::types::{
    ChatMessage, ColumnDefinition, ColumnType, DatabaseUpdate, ExecutionFilter, Filter,
    FilterOperator, GenerationParams, QueryOptions, SortOrder, TableUpdate, WorkflowStatus,
};
use dataapi::{ApiRequest, ErrorKind, Shaped};
use mockito::Matcher;
use serde::Deserialize;
use serde_json::json;
use support::{MockServerFixture, API_KEY};

const DB: &str = r#"{
    "id": "db_123",
    "name": "analytics",
    "description": null,
    "created_at": "2024-01-01T00:00:00Z",
    "updated_at": "2024-01-02T00:00:00Z",
    "owner_id": "user_1",
    "metadata": {"team": "data"},
    "region": "eu-west-1"
}"#;

fn page_of(items: serde_json::Value) -> String {
    json!({
        "data": items,
        "pagination": {
            "page": 2, "per_page": 10, "total": 11,
            "total_pages": 2, "has_next": false, "has_prev": true
        }
    })
    .to_string()
}

#[tokio::test]
async fn invalid_api_key_is_authentication_error() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/v1/databases/db_123")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"Invalid API key","error_code":"INVALID_API_KEY"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = fixture.client();
    let err = client.databases().get_database("db_123").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Authentication);
    assert_eq!(err.message(), "Invalid API key");
    assert_eq!(err.error_code(), Some("INVALID_API_KEY"));
    assert_eq!(err.status_code(), Some(401));
    mock.assert_async().await;
}

#[tokio::test]
async fn missing_resource_is_not_found() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("GET", "/v1/workflows/wf_missing")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Resource not found"}"#)
        .create_async()
        .await;

    let err = fixture
        .client()
        .workflows()
        .get_workflow("wf_missing")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "Resource not found");
    assert_eq!(err.to_string(), "Resource not found | Status: 404");
}

#[tokio::test]
async fn get_database_sends_headers_and_coerces() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/v1/databases/db_123")
        .match_header("x-api-key", API_KEY)
        .match_header("accept", "application/json")
        .match_header(
            "user-agent",
            Matcher::Regex(r"^dataapi-rust/\d+\.\d+\.\d+".to_string()),
        )
        .match_header("x-dataapi-request-id", Matcher::Any)
        .match_header("content-type", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DB)
        .create_async()
        .await;

    let db = fixture
        .client()
        .databases()
        .get_database("db_123")
        .await
        .unwrap();

    assert_eq!(db.id, "db_123");
    assert_eq!(db.name, "analytics");
    assert_eq!(db.description, None);
    assert_eq!(db.metadata["team"], "data");
    mock.assert_async().await;
}

#[tokio::test]
async fn list_databases_flattens_query_options() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/v1/databases")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("per_page".into(), "10".into()),
            Matcher::UrlEncoded("sort".into(), "created_at:desc,name:asc".into()),
            Matcher::UrlEncoded("filter[status][in]".into(), "active,archived".into()),
            Matcher::UrlEncoded("search".into(), "sales".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_of(json!([serde_json::from_str::<serde_json::Value>(DB).unwrap()])))
        .create_async()
        .await;

    let options = QueryOptions::builder()
        .page(2)
        .per_page(10)
        .sort("created_at", SortOrder::Desc)
        .sort("name", SortOrder::Asc)
        .filter(Filter::new("status", FilterOperator::In, json!(["active", "archived"])))
        .search("sales")
        .build()
        .unwrap();

    let page = fixture
        .client()
        .databases()
        .list_databases(Some(&options))
        .await
        .unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.pagination.total, 11);
    assert!(page.pagination.has_prev);
    mock.assert_async().await;
}

#[tokio::test]
async fn create_table_posts_schema() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/v1/databases/db_123/tables")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "name": "events",
            "schema": [
                {"name": "id", "type": "string", "nullable": false, "primary_key": true},
                {"name": "payload", "type": "json", "nullable": true}
            ]
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "tbl_1",
                "name": "events",
                "database_id": "db_123",
                "schema": [
                    {"name": "id", "type": "string", "nullable": false, "primary_key": true, "unique": true},
                    {"name": "payload", "type": "json"}
                ],
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let schema = [
        ColumnDefinition::new("id", ColumnType::String).primary_key(),
        ColumnDefinition::new("payload", ColumnType::Json),
    ];
    let table = fixture
        .client()
        .databases()
        .create_table("db_123", "events", &schema, None)
        .await
        .unwrap();

    assert_eq!(table.row_count, 0);
    assert!(table.schema[1].nullable);
    mock.assert_async().await;
}

#[tokio::test]
async fn update_record_patches_with_version() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("PATCH", "/v1/databases/db_1/tables/tbl_1/records/rec_1")
        .match_body(Matcher::Json(json!({"data": {"count": 3}, "version": 2})))
        .with_status(409)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message":"Version conflict","error_code":"VERSION_MISMATCH"}"#)
        .create_async()
        .await;

    let mut data = serde_json::Map::new();
    data.insert("count".into(), json!(3));
    let err = fixture
        .client()
        .databases()
        .update_record("db_1", "tbl_1", "rec_1", data, Some(2))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.error_code(), Some("VERSION_MISMATCH"));
    mock.assert_async().await;
}

#[tokio::test]
async fn update_database_sends_only_set_fields() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("PATCH", "/v1/databases/db_123")
        .match_body(Matcher::Json(json!({"name": "renamed"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(DB)
        .create_async()
        .await;

    let update = DatabaseUpdate {
        name: Some("renamed".into()),
        ..Default::default()
    };
    fixture
        .client()
        .databases()
        .update_database("db_123", &update)
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn delete_accepts_empty_body() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("DELETE", "/v1/databases/db_123")
        .with_status(204)
        .create_async()
        .await;

    fixture
        .client()
        .databases()
        .delete_database("db_123")
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn shape_mismatch_is_validation_error() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("GET", "/v1/databases/db_123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 123}"#)
        .create_async()
        .await;

    let err = fixture
        .client()
        .databases()
        .get_database("db_123")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().starts_with("Response validation failed"));
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
}

#[tokio::test]
async fn shaped_list_reports_failing_index() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("GET", "/v1/items")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1}, {"id": "two"}]"#)
        .create_async()
        .await;
    fixture
        .server
        .mock("GET", "/v1/items/1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": 1}"#)
        .create_async()
        .await;

    let client = fixture.client();
    let err = client
        .execute_shaped::<Item>(ApiRequest::get("/items"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.message().starts_with("Response validation failed at index 1"));
    assert_eq!(err.details(), Some(&json!({"index": 1})));

    let one = client
        .execute_shaped::<Item>(ApiRequest::get("/items/1"))
        .await
        .unwrap();
    assert_eq!(one, Shaped::One(Item { id: 1 }));
}

#[tokio::test]
async fn generate_text_merges_params() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/v1/ai/generate/text")
        .match_body(Matcher::Json(json!({
            "model_id": "gpt-4",
            "prompt": "Summarize",
            "max_tokens": 64,
            "temperature": 0.5
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "gen_1",
                "model_id": "gpt-4",
                "prompt": "Summarize",
                "response": "Done.",
                "tokens_used": 12,
                "created_at": "2024-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let params = GenerationParams::default().max_tokens(64).temperature(0.5);
    let response = fixture
        .client()
        .ai()
        .generate_text("gpt-4", "Summarize", &params)
        .await
        .unwrap();
    assert_eq!(response.response, "Done.");
    assert_eq!(response.tokens_used, 12);
    mock.assert_async().await;
}

#[tokio::test]
async fn chat_completion_sends_roles() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/v1/ai/chat/completions")
        .match_body(Matcher::Json(json!({
            "model_id": "gpt-4",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hi"}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "chat_1",
                "model_id": "gpt-4",
                "prompt": "Hi",
                "response": "Hello.",
                "tokens_used": 5,
                "created_at": "2024-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let messages = [ChatMessage::system("Be brief."), ChatMessage::user("Hi")];
    fixture
        .client()
        .ai()
        .chat_completion("gpt-4", &messages, &GenerationParams::default())
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn list_executions_filters_by_status() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/v1/workflow-executions")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("workflow_id".into(), "wf_1".into()),
            Matcher::UrlEncoded("status".into(), "failed".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_of(json!([{
            "id": "exec_1",
            "workflow_id": "wf_1",
            "status": "failed",
            "started_at": "2024-01-01T00:00:00Z",
            "error_message": "step 2 crashed"
        }])))
        .create_async()
        .await;

    let filter = ExecutionFilter {
        workflow_id: Some("wf_1".into()),
        status: Some(WorkflowStatus::Failed),
    };
    let page = fixture
        .client()
        .workflows()
        .list_executions(&filter, None)
        .await
        .unwrap();
    assert_eq!(page.data[0].status, WorkflowStatus::Failed);
    assert!(page.data[0].status.is_terminal());
    mock.assert_async().await;
}

#[tokio::test]
async fn execute_workflow_posts_input() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/v1/workflows/wf_1/execute")
        .match_body(Matcher::Json(json!({"input_data": {"day": "monday"}, "metadata": {}})))
        .with_status(202)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "exec_9",
                "workflow_id": "wf_1",
                "status": "pending",
                "started_at": "2024-01-01T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut input = serde_json::Map::new();
    input.insert("day".into(), json!("monday"));
    let execution = fixture
        .client()
        .workflows()
        .execute_workflow("wf_1", Some(input))
        .await
        .unwrap();
    assert_eq!(execution.id, "exec_9");
    assert_eq!(execution.status, WorkflowStatus::Pending);
    mock.assert_async().await;
}

fn ai_response(id: &str, text: &str) -> serde_json::Value {
    json!({
        "id": id,
        "model_id": "gpt-4",
        "prompt": "p",
        "response": text,
        "tokens_used": 3,
        "created_at": "2024-01-01T00:00:00Z"
    })
}

#[tokio::test]
async fn update_table_patches_table_path() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("PATCH", "/v1/databases/db_1/tables/tbl_1")
        .match_body(Matcher::Json(json!({"description": "daily events"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "tbl_1",
                "name": "events",
                "database_id": "db_1",
                "schema": [],
                "description": "daily events",
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-03T00:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let update = TableUpdate {
        description: Some("daily events".into()),
        ..Default::default()
    };
    let table = fixture
        .client()
        .databases()
        .update_table("db_1", "tbl_1", &update)
        .await
        .unwrap();
    assert_eq!(table.description.as_deref(), Some("daily events"));
    mock.assert_async().await;
}

#[tokio::test]
async fn batch_generate_text_unwraps_responses() {
    let mut fixture = MockServerFixture::new().await;
    let requests = vec![
        json!({"model_id": "gpt-4", "prompt": "one"}),
        json!({"model_id": "gpt-4", "prompt": "two"}),
    ];
    let mock = fixture
        .server
        .mock("POST", "/v1/ai/batch/generate/text")
        .match_body(Matcher::Json(json!({
            "requests": requests,
            "metadata": {"job": "nightly"}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"responses": [ai_response("gen_1", "1"), ai_response("gen_2", "2")]}).to_string(),
        )
        .create_async()
        .await;

    let mut metadata = serde_json::Map::new();
    metadata.insert("job".into(), json!("nightly"));
    let batch = fixture
        .client()
        .ai()
        .batch_generate_text(&requests, Some(metadata))
        .await
        .unwrap();
    let ids: Vec<_> = batch.responses.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["gen_1", "gen_2"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn ai_response_history() {
    let mut fixture = MockServerFixture::new().await;
    let list = fixture
        .server
        .mock("GET", "/v1/ai/responses")
        .match_query(Matcher::UrlEncoded("per_page".into(), "5".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_of(json!([ai_response("gen_1", "hello")])))
        .create_async()
        .await;
    let get = fixture
        .server
        .mock("GET", "/v1/ai/responses/gen_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ai_response("gen_1", "hello").to_string())
        .create_async()
        .await;
    let delete = fixture
        .server
        .mock("DELETE", "/v1/ai/responses/gen_1")
        .with_status(204)
        .create_async()
        .await;

    let client = fixture.client();
    let options = QueryOptions::builder().per_page(5).build().unwrap();
    let page = client.ai().list_responses(Some(&options)).await.unwrap();
    assert_eq!(page.data[0].response, "hello");

    let response = client.ai().get_response("gen_1").await.unwrap();
    assert_eq!(response.id, "gen_1");

    client.ai().delete_response("gen_1").await.unwrap();

    list.assert_async().await;
    get.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn workflow_templates() {
    let mut fixture = MockServerFixture::new().await;
    let list = fixture
        .server
        .mock("GET", "/v1/workflow-templates")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(page_of(json!([{"id": "tpl_etl", "name": "ETL"}])))
        .create_async()
        .await;
    let create = fixture
        .server
        .mock("POST", "/v1/workflow-templates/tpl_etl/create")
        .match_body(Matcher::Json(json!({
            "name": "nightly-etl",
            "parameters": {"source": "s3"},
            "metadata": {}
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "wf_7",
                "name": "nightly-etl",
                "steps": [],
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z",
                "owner_id": "user_1"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = fixture.client();
    let templates = client.workflows().list_templates(None).await.unwrap();
    assert_eq!(templates.data[0]["id"], "tpl_etl");

    let mut parameters = serde_json::Map::new();
    parameters.insert("source".into(), json!("s3"));
    let workflow = client
        .workflows()
        .create_from_template("tpl_etl", "nightly-etl", Some(parameters), None)
        .await
        .unwrap();
    assert_eq!(workflow.id, "wf_7");
    assert!(workflow.is_active);

    list.assert_async().await;
    create.assert_async().await;
}

#[tokio::test]
async fn plain_text_response_is_returned_as_text() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .server
        .mock("GET", "/v1/health")
        .with_status(200)
        .with_header("content-type", "text/plain")
        .with_body("OK")
        .create_async()
        .await;

    let payload = fixture
        .client()
        .execute(ApiRequest::get("/health"))
        .await
        .unwrap();
    assert_eq!(payload.as_text(), Some("OK"));
}

#[tokio::test]
async fn ids_are_encoded_as_single_segments() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/v1/ai/models/org%2Fmodel")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id":"org/model","name":"M","provider":"openai"}"#)
        .create_async()
        .await;

    let model = fixture.client().ai().get_model("org/model").await.unwrap();
    assert_eq!(model.id, "org/model");
    assert!(model.is_available);
    mock.assert_async().await;
}
