//! # dataapi
//!
//! Client SDK for the DataAPI platform: databases, AI models and workflows
//! behind one authenticated HTTP API.
//!
//! ## Overview
//!
//! Every call goes through a single execution pipeline: build the URL, attach
//! credentials and a request id, send with a per-attempt timeout, classify the
//! outcome into a closed [`Error`] set, and retry only what is retryable with
//! exponential backoff. Resource façades ([`services`]) are thin mappings from
//! typed arguments to requests on top of that pipeline.
//!
//! ## Key Features
//!
//! - **Two modes**: [`Client`] is async; [`BlockingClient`] wraps the same core
//!   for synchronous callers
//! - **Credentials**: API key, bearer token, or OAuth2 client credentials with
//!   single-flight token refresh
//! - **Closed error taxonomy**: [`ErrorKind`] decides retryability; HTTP status
//!   and transport failures are classified in one place
//! - **Typed responses**: payloads are coerced into the caller's type, with
//!   per-element diagnostics for lists
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dataapi::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> dataapi::Result<()> {
//!     let client = Client::with_api_key("your-api-key", ClientConfig::default())?;
//!
//!     let databases = client.databases().list_databases(None).await?;
//!     for db in databases.data {
//!         println!("{} ({})", db.name, db.id);
//!     }
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Async and blocking executors, request and response types |
//! | [`services`] | Database, AI and workflow façades |
//! | [`auth`] | Credential providers |
//! | [`config`] | Client configuration |
//! | [`transport`] | HTTP transport seam |
//! | [`types`] | Domain models and query options |
//! | [`error`] | Error type and context |

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod error_kind;
pub mod services;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use auth::{ApiKeyAuth, BearerTokenAuth, CredentialProvider, OAuth2Auth, OAuth2Token};
pub use client::{
    ApiRequest, BlockingClient, BlockingSession, CallStats, Client, ClientBuilder, Payload,
    Session, Shaped,
};
pub use config::ClientConfig;
pub use error::{BoxError, Error, ErrorContext, NetworkFailure};
pub use error_kind::ErrorKind;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
