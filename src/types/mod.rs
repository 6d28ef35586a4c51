//! Domain value types exchanged with the DataAPI platform.
//!
//! Response types deserialize leniently: unknown fields are ignored and
//! collection fields default to empty.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`common`] | Pagination and query options |
//! | [`database`] | Databases, tables, columns and records |
//! | [`ai`] | Models, generation requests and responses |
//! | [`workflow`] | Workflows, steps and executions |
//!
//! ## Example
//!
//! ```rust
//! use dataapi::types::{Filter, FilterOperator, QueryOptions, SortOrder};
//!
//! let options = QueryOptions::builder()
//!     .page(2)
//!     .per_page(50)
//!     .sort("created_at", SortOrder::Desc)
//!     .filter(Filter::new("status", FilterOperator::Eq, "active"))
//!     .build()
//!     .unwrap();
//! let pairs = options.to_query_pairs();
//! assert!(pairs.contains(&("page".to_string(), "2".to_string())));
//! ```

pub mod ai;
pub mod common;
pub mod database;
pub mod workflow;

pub use ai::{
    AiModel, AiProvider, AiResponse, BatchGeneration, ChatMessage, ChatRole, GenerationParams,
    UsageQuery,
};
pub use common::{
    Filter, FilterOperator, Metadata, PageInfo, PaginatedResponse, QueryOptions,
    QueryOptionsBuilder, SortField, SortOrder,
};
pub use database::{
    ColumnDefinition, ColumnType, Database, DatabaseUpdate, Record, Table, TableUpdate,
};
pub use workflow::{
    ExecutionFilter, Workflow, WorkflowExecution, WorkflowStatus, WorkflowStep, WorkflowUpdate,
};
