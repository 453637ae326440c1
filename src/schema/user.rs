use async_graphql::{Context, Object};

use super::services;
use crate::auth::current_principal;
use crate::errors::UserResult;

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    /// The signed-in user
    async fn viewer(&self, ctx: &Context<'_>) -> async_graphql::Result<UserResult> {
        Ok(services(ctx)?.users.viewer(current_principal(ctx)).await)
    }
}
