//! Shared fixtures: a mockito server and a scripted in-memory transport.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use dataapi::transport::{HttpRequest, HttpResponse, Transport, TransportError, TransportFactory};
use dataapi::{Client, ClientConfig};
use mockito::{Server, ServerGuard};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_KEY: &str = "test-api-key";

/// Routes library logs to the test harness; `RUST_LOG=dataapi=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = format!("{}/v1", server.url());
        Self { server, base_url }
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::builder()
            .base_url(&self.base_url)
            .max_retries(0)
            .retry_delay(Duration::from_millis(10))
            .timeout(Duration::from_secs(5))
            .build()
            .expect("valid test config")
    }

    pub fn client(&self) -> Client {
        Client::with_api_key(API_KEY, self.config()).expect("client")
    }
}

/// One scripted outcome for a single attempt.
#[derive(Debug, Clone)]
pub enum Step {
    /// Never answers; the executor's per-attempt timeout fires.
    Hang,
    Connect,
    Json(u16, serde_json::Value),
    Text(u16, &'static str),
}

/// Transport that replays a fixed script and records every attempt.
#[derive(Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport script exhausted")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        match self.next_step() {
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                unreachable!("executor timeout fires first")
            }
            Step::Connect => Err(TransportError::Connect("connection refused".into())),
            Step::Json(status, body) => Ok(response(status, "application/json", body.to_string())),
            Step::Text(status, body) => Ok(response(status, "text/plain", body.to_string())),
        }
    }
}

fn response(status: u16, content_type: &'static str, body: String) -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    HttpResponse::new(status, headers, Bytes::from(body))
}

/// Factory handing out `transport` and counting how often it was asked.
pub fn factory(transport: Arc<ScriptedTransport>, opened: Arc<AtomicUsize>) -> TransportFactory {
    Arc::new(move |_config: &ClientConfig| {
        opened.fetch_add(1, Ordering::SeqCst);
        let transport: Arc<dyn Transport> = transport.clone();
        Ok(transport)
    })
}

pub fn scripted_config(max_retries: u32, retry_delay: Duration) -> ClientConfig {
    ClientConfig::builder()
        .base_url("https://api.test.local/v1")
        .max_retries(max_retries)
        .retry_delay(retry_delay)
        .timeout(Duration::from_secs(5))
        .build()
        .expect("valid test config")
}

/// Client over a scripted transport. Returns the transport and the factory
/// open counter for assertions.
pub fn scripted_client(
    steps: impl IntoIterator<Item = Step>,
    config: ClientConfig,
) -> (Client, Arc<ScriptedTransport>, Arc<AtomicUsize>) {
    let transport = ScriptedTransport::new(steps);
    let opened = Arc::new(AtomicUsize::new(0));
    let client = Client::builder()
        .config(config)
        .api_key(API_KEY)
        .transport_factory(factory(transport.clone(), opened.clone()))
        .build()
        .expect("client");
    (client, transport, opened)
}
