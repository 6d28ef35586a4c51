//! Resource façades.
//!
//! Each façade method maps its arguments to an [`ApiRequest`] and hands it to
//! a [`Backend`]. The backend decides how the call completes: [`Client`]
//! returns a future, [`BlockingClient`] returns the result directly. The same
//! façade code therefore serves both modes.
//!
//! ```rust,no_run
//! # async fn demo() -> dataapi::Result<()> {
//! use dataapi::{Client, ClientConfig};
//!
//! let client = Client::with_api_key("key", ClientConfig::default())?;
//! let db = client.databases().get_database("db_123").await?;
//!
//! let blocking = client.to_blocking();
//! # drop(blocking);
//! # Ok(())
//! # }
//! ```

mod ai;
mod databases;
mod workflows;

pub use ai::AiService;
pub use databases::DatabaseService;
pub use workflows::WorkflowService;

use crate::client::{ApiRequest, BlockingClient, Client};
use crate::types::QueryOptions;
use crate::Result;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

/// A pinned, boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Completes façade calls in one executor mode.
pub trait Backend {
    /// What a façade method returns: a future or an immediate result.
    type Call<'a, T>
    where
        Self: 'a,
        T: 'a;

    /// Executes `request` and deserializes the payload into `T`.
    fn call<'a, T>(&'a self, request: ApiRequest) -> Self::Call<'a, T>
    where
        T: DeserializeOwned + Send + 'a;

    /// Executes `request` and discards the payload.
    fn call_unit(&self, request: ApiRequest) -> Self::Call<'_, ()>;
}

impl Backend for Client {
    type Call<'a, T> = BoxFuture<'a, Result<T>>
    where
        Self: 'a,
        T: 'a;

    fn call<'a, T>(&'a self, request: ApiRequest) -> BoxFuture<'a, Result<T>>
    where
        T: DeserializeOwned + Send + 'a,
    {
        Box::pin(self.execute_as(request))
    }

    fn call_unit(&self, request: ApiRequest) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.execute(request).await.map(|_| ()) })
    }
}

impl Backend for BlockingClient {
    type Call<'a, T> = Result<T>
    where
        Self: 'a,
        T: 'a;

    fn call<'a, T>(&'a self, request: ApiRequest) -> Result<T>
    where
        T: DeserializeOwned + Send + 'a,
    {
        self.execute_as(request)
    }

    fn call_unit(&self, request: ApiRequest) -> Result<()> {
        self.execute(request).map(|_| ())
    }
}

fn with_options(request: ApiRequest, options: Option<&QueryOptions>) -> ApiRequest {
    match options {
        Some(options) => request.query_pairs(options.to_query_pairs()),
        None => request,
    }
}

/// Percent-encodes an identifier for use as a single path segment.
fn segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
