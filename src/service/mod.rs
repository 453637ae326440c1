//! Operation layer
//!
//! Each operation resolves the principal, validates its input, checks
//! ownership and uniqueness, then calls storage. Failures come back as
//! [`ApiError`](crate::errors::ApiError) and are folded into the operation's
//! result union before they leave this module.

use async_graphql::ID;

use crate::storage::Database;

pub mod categories;
pub mod todos;
pub mod users;

pub use categories::CategoryService;
pub use todos::TodoService;
pub use users::UserService;

/// All services, built once from the database handle
#[derive(Debug, Clone)]
pub struct Services {
    pub todos: TodoService,
    pub categories: CategoryService,
    pub users: UserService,
}

impl Services {
    pub fn new(db: &Database) -> Self {
        Self {
            todos: TodoService::new(db),
            categories: CategoryService::new(db),
            users: UserService::new(db),
        }
    }
}

/// Distinct ids, first occurrence order
pub(crate) fn distinct_ids(ids: &[ID]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.iter().any(|seen| seen == id.as_str()) {
            out.push(id.to_string());
        }
    }
    out
}
