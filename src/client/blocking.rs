//! Blocking adapter over the async executor.
//!
//! Each call occupies the calling thread for its full duration, backoff sleeps
//! included. Calls are driven on a private current-thread tokio runtime that is
//! created together with the transport and released with it.

use super::core::Client;
use super::request::{ApiRequest, Payload};
use super::shape::Shaped;
use super::types::CallStats;
use crate::auth::OAuth2Auth;
use crate::services::{AiService, DatabaseService, WorkflowService};
use crate::{ClientConfig, Error, ErrorContext, ErrorKind, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::{Builder, Handle, Runtime};

/// Synchronous DataAPI client with the same retry and error semantics as
/// [`Client`].
pub struct BlockingClient {
    core: Client,
    runtime: Mutex<Option<Arc<Runtime>>>,
}

impl BlockingClient {
    pub(crate) fn from_client(core: Client) -> Self {
        Self {
            core,
            runtime: Mutex::new(None),
        }
    }

    pub fn with_api_key(api_key: impl Into<String>, config: ClientConfig) -> Result<Self> {
        Client::with_api_key(api_key, config).map(Self::from_client)
    }

    pub fn with_bearer_token(token: impl Into<String>, config: ClientConfig) -> Result<Self> {
        Client::with_bearer_token(token, config).map(Self::from_client)
    }

    pub fn with_oauth2(auth: OAuth2Auth, config: ClientConfig) -> Result<Self> {
        Client::with_oauth2(auth, config).map(Self::from_client)
    }

    pub fn from_env() -> Result<Self> {
        Client::from_env().map(Self::from_client)
    }

    pub fn config(&self) -> &ClientConfig {
        self.core.config()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<Runtime>>> {
        self.runtime.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn runtime(&self) -> Result<Arc<Runtime>> {
        let mut slot = self.slot();
        if let Some(rt) = slot.as_ref() {
            return Ok(rt.clone());
        }
        let rt = Arc::new(Builder::new_current_thread().enable_all().build().map_err(|e| {
            Error::unknown("Failed to start blocking runtime").with_cause(e)
        })?);
        *slot = Some(rt.clone());
        Ok(rt)
    }

    /// Runs `fut` to completion on the private runtime.
    ///
    /// Fails instead of blocking when the calling thread is driving an async
    /// runtime. Threads that only carry a runtime handle, such as those used by
    /// `tokio::task::spawn_blocking`, may block.
    pub fn wait<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let rt = self.runtime()?;
        if Handle::try_current().is_err() {
            return rt.block_on(fut);
        }
        // tokio rejects nested runtimes by panicking before the future is polled.
        match panic::catch_unwind(AssertUnwindSafe(|| rt.block_on(fut))) {
            Ok(result) => result,
            Err(payload) if is_nested_runtime_panic(payload.as_ref()) => Err(Error::from_kind(
                ErrorKind::Unknown,
                "BlockingClient cannot be used from within an async runtime; use Client instead",
                ErrorContext::new().with_source("blocking"),
            )),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    pub fn execute(&self, request: ApiRequest) -> Result<Payload> {
        self.wait(self.core.execute(request))
    }

    pub fn execute_with_stats(&self, request: ApiRequest) -> Result<(Payload, CallStats)> {
        self.wait(self.core.execute_with_stats(request))
    }

    pub fn execute_as<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.wait(self.core.execute_as(request))
    }

    pub fn execute_shaped<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Shaped<T>> {
        self.wait(self.core.execute_shaped(request))
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.wait(self.core.get(path))
    }

    pub fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.wait(self.core.post(path, body))
    }

    pub fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.wait(self.core.put(path, body))
    }

    pub fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<T> {
        self.wait(self.core.patch(path, body))
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.wait(self.core.delete(path))
    }

    pub fn health_check(&self) -> Result<Value> {
        self.wait(self.core.health_check())
    }

    pub fn user_info(&self) -> Result<Value> {
        self.wait(self.core.user_info())
    }

    pub fn api_info(&self) -> Result<Value> {
        self.wait(self.core.api_info())
    }

    pub fn databases(&self) -> DatabaseService<'_, BlockingClient> {
        DatabaseService::new(self)
    }

    pub fn ai(&self) -> AiService<'_, BlockingClient> {
        AiService::new(self)
    }

    pub fn workflows(&self) -> WorkflowService<'_, BlockingClient> {
        WorkflowService::new(self)
    }

    pub fn is_open(&self) -> bool {
        self.core.is_open()
    }

    /// Releases the transport and the private runtime. Idempotent.
    pub fn close(&self) {
        self.core.close();
        let runtime = self.slot().take();
        if let Some(rt) = runtime {
            release_runtime(rt);
        }
    }

    pub fn session(&self) -> BlockingSession<'_> {
        BlockingSession { client: self }
    }
}

fn is_nested_runtime_panic(payload: &(dyn Any + Send)) -> bool {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
    message.is_some_and(|m| m.starts_with("Cannot start a runtime from within a runtime"))
}

// A runtime may not be dropped from async context; detach it instead.
fn release_runtime(rt: Arc<Runtime>) {
    if let Ok(rt) = Arc::try_unwrap(rt) {
        if Handle::try_current().is_ok() {
            rt.shutdown_background();
        }
    }
}

impl Drop for BlockingClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingClient")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// Guard returned by [`BlockingClient::session`]; closes the client on drop.
pub struct BlockingSession<'a> {
    client: &'a BlockingClient,
}

impl Deref for BlockingSession<'_> {
    type Target = BlockingClient;

    fn deref(&self) -> &BlockingClient {
        self.client
    }
}

impl Drop for BlockingSession<'_> {
    fn drop(&mut self) {
        self.client.close();
    }
}
