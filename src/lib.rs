//! # todo-graphql
//!
//! Multi-tenant todo and category service exposed over GraphQL.
//!
//! ## Features
//!
//! - **Keyset Pagination** - Relay-style connections over `(created_at, id)` cursors
//! - **Filter Composition** - owner-scoped, parameterised SQL predicates
//! - **Result Envelopes** - every operation returns a typed success or error variant
//! - **Owner Scoping** - rows are only ever read or written through `(id, owner_id)`
//! - **DataLoader** - batched, per-request relation loading
//! - **Auth Middleware** - session resolution and context injection for the GraphQL handler
//!
//! ## Usage
//!
//! ```rust,no_run
//! use todo_graphql::{schema::build_schema, storage::Database};
//!
//! # async fn example() -> todo_graphql::Result<()> {
//! let db = Database::connect("sqlite://todos.db", 10).await?;
//! let schema = build_schema(&db);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod dataloaders;
pub mod errors;
pub mod filter;
pub mod models;
pub mod ownership;
pub mod pagination;
pub mod schema;
pub mod service;
pub mod storage;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{graphql_handler, HeaderSessionResolver, SessionResolver, SessionTokenResolver};
pub use config::{AuthMode, ServerConfig};
pub use errors::ApiError;
pub use ownership::{require_ownership, Principal};
pub use pagination::{Connection, CursorCodec, Edge, PageInfo, PaginationInput};
pub use types::DateTime;

use thiserror::Error;

/// Crate-level errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Pagination error on '{field}': {message}")]
    Pagination {
        field: &'static str,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Result type for crate operations
pub type Result<T> = std::result::Result<T, Error>;
