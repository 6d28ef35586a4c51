//! DataAPI clients and the request execution pipeline.
//!
//! [`Client`] is the async executor; [`BlockingClient`] drives the same core on
//! a private runtime. Implementation details are split into submodules under
//! `src/client/`.

pub mod blocking;
pub mod builder;
pub mod core;
pub mod error_classification;
mod execution;
mod policy;
pub mod request;
mod shape;
pub mod types;

pub use blocking::{BlockingClient, BlockingSession};
pub use builder::ClientBuilder;
pub use self::core::{Client, Session};
pub use error_classification::{classify_response, classify_transport};
pub use execution::REQUEST_ID_HEADER;
pub use request::{ApiRequest, Payload};
pub use shape::Shaped;
pub use types::CallStats;
