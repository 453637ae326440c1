//! Domain entities and GraphQL input objects

use async_graphql::{InputObject, MaybeUndefined, SimpleObject, ID};

use crate::types::DateTime;

pub const TODO: &str = "Todo";
pub const CATEGORY: &str = "Category";
pub const USER: &str = "User";

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
#[graphql(complex)]
pub struct Todo {
    pub id: ID,
    pub title: String,
    pub content: String,
    pub completed: bool,
    pub due_date: Option<DateTime>,
    #[graphql(skip)]
    pub owner_id: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
#[graphql(complex)]
pub struct Category {
    pub id: ID,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    #[graphql(skip)]
    pub owner_id: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: ID,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct TodoCreateInput {
    pub title: String,
    pub content: Option<String>,
    pub completed: Option<bool>,
    pub due_date: Option<DateTime>,
    pub category_ids: Option<Vec<ID>>,
}

/// Partial update; absent fields are left unchanged
#[derive(InputObject, Debug, Clone)]
pub struct TodoUpdateInput {
    pub id: ID,
    pub title: Option<String>,
    pub content: Option<String>,
    pub completed: Option<bool>,
    /// `null` clears the due date
    pub due_date: MaybeUndefined<DateTime>,
    /// Replaces the full set of assigned categories
    pub category_ids: Option<Vec<ID>>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct TodoFilterInput {
    /// Case-insensitive substring of the title
    pub title: Option<String>,
    pub completed: Option<bool>,
    /// Todos assigned to at least one of these categories
    pub category_ids: Option<Vec<ID>>,
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct CategoryCreateInput {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(InputObject, Debug, Clone)]
pub struct CategoryUpdateInput {
    pub id: ID,
    pub name: Option<String>,
    pub description: MaybeUndefined<String>,
    pub color: MaybeUndefined<String>,
}
