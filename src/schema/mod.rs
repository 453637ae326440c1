//! GraphQL schema
//!
//! Root objects are merged from one query and one mutation object per entity.
//! Resolvers only unpack arguments and the request principal; the operation
//! itself lives in [`crate::service`].

use async_graphql::{Context, EmptySubscription, MergedObject, Schema};

use crate::service::Services;
use crate::storage::Database;

mod category;
mod todo;
mod user;

pub use category::{CategoryMutation, CategoryQuery};
pub use todo::{TodoMutation, TodoQuery};
pub use user::UserQuery;

#[derive(MergedObject, Default)]
pub struct Query(TodoQuery, CategoryQuery, UserQuery);

#[derive(MergedObject, Default)]
pub struct Mutation(TodoMutation, CategoryMutation);

pub type AppSchema = Schema<Query, Mutation, EmptySubscription>;

/// Build the schema with its services bound to `db`
pub fn build_schema(db: &Database) -> AppSchema {
    Schema::build(Query::default(), Mutation::default(), EmptySubscription)
        .data(Services::new(db))
        .finish()
}

pub(crate) fn services<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Services> {
    ctx.data::<Services>()
}
