//! GraphQL authentication middleware and context extraction
//!
//! Provides helpers for:
//! - Resolving the session principal from HTTP headers, once per request
//! - Creating the GraphQL request context with the principal and its loaders
//! - The Axum handler for the GraphQL endpoint

use std::sync::Arc;

use async_graphql::{Context, Request, Response};
use async_trait::async_trait;
use axum::{extract::Extension, http::HeaderMap, Json};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::dataloaders::{
    CategoryTodosBatch, CategoryTodosLoader, DataLoader, TodoCategoriesBatch, TodoCategoriesLoader,
};
use crate::ownership::Principal;
use crate::schema::AppSchema;
use crate::storage::{Database, UserStorage};
use crate::types::DateTime;

/// Header carrying a user id set by a trusted upstream gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Turns request headers into the authenticated principal, if any
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve_session(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Extract user_id from x-user-id header
pub fn extract_user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Trusts the `x-user-id` header
#[derive(Debug, Clone, Default)]
pub struct HeaderSessionResolver;

#[async_trait]
impl SessionResolver for HeaderSessionResolver {
    async fn resolve_session(&self, headers: &HeaderMap) -> Option<Principal> {
        extract_user_id(headers).map(Principal::new)
    }
}

/// Looks bearer tokens up in the sessions table
#[derive(Debug, Clone)]
pub struct SessionTokenResolver {
    users: UserStorage,
}

impl SessionTokenResolver {
    pub fn new(users: UserStorage) -> Self {
        Self { users }
    }
}

#[async_trait]
impl SessionResolver for SessionTokenResolver {
    async fn resolve_session(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = extract_bearer_token(headers)?;
        match self.users.session_user_id(token, DateTime::now()).await {
            Ok(user_id) => user_id.map(Principal::new),
            Err(e) => {
                // Treated as anonymous; resolvers answer with UnauthorizedError
                warn!(error = %e, "Session lookup failed");
                None
            }
        }
    }
}

/// Attach the principal and its owner-scoped loaders to a request
pub fn with_principal(mut request: Request, db: &Database, principal: Option<Principal>) -> Request {
    if let Some(principal) = principal {
        let categories: TodoCategoriesLoader =
            DataLoader::new(TodoCategoriesBatch::new(db.categories(), &principal.user_id));
        let todos: CategoryTodosLoader =
            DataLoader::new(CategoryTodosBatch::new(db.todos(), &principal.user_id));
        request = request.data(categories).data(todos).data(principal);
    }
    request
}

/// GraphQL handler with authentication context injection
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use axum::{extract::Extension, routing::post, Router};
/// use todo_graphql::{auth::{graphql_handler, SessionResolver}, HeaderSessionResolver};
/// use todo_graphql::{schema::build_schema, storage::Database};
///
/// # async fn example(db: Database) {
/// let resolver: Arc<dyn SessionResolver> = Arc::new(HeaderSessionResolver);
/// let app: Router = Router::new()
///     .route("/graphql", post(graphql_handler))
///     .layer(Extension(build_schema(&db)))
///     .layer(Extension(db))
///     .layer(Extension(resolver));
/// # }
/// ```
pub async fn graphql_handler(
    Extension(schema): Extension<AppSchema>,
    Extension(db): Extension<Database>,
    Extension(resolver): Extension<Arc<dyn SessionResolver>>,
    headers: HeaderMap,
    req: Json<Request>,
) -> Json<Response> {
    let request_id = Uuid::new_v4();
    let span = info_span!("graphql", %request_id);

    async move {
        let principal = resolver.resolve_session(&headers).await;
        debug!(
            authenticated = principal.is_some(),
            operation = req.0.operation_name.as_deref().unwrap_or("anonymous"),
            "Executing GraphQL request"
        );

        let request = with_principal(req.0, &db, principal);
        Json(schema.execute(request).await)
    }
    .instrument(span)
    .await
}

/// Get the principal from GraphQL context
pub fn current_principal<'a>(ctx: &Context<'a>) -> Option<&'a Principal> {
    ctx.data_opt::<Principal>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_session, seed_user, test_db};
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_extract_headers() {
        let map = headers(&[(USER_ID_HEADER, " alice "), ("Authorization", "Bearer tok")]);
        assert_eq!(extract_user_id(&map), Some("alice".to_string()));
        assert_eq!(extract_bearer_token(&map), Some("tok"));

        let map = headers(&[("Authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_bearer_token(&map), None);
        assert_eq!(extract_user_id(&map), None);
    }

    #[test]
    fn test_header_resolver() {
        let resolver = HeaderSessionResolver;
        let principal =
            tokio_test::block_on(resolver.resolve_session(&headers(&[(USER_ID_HEADER, "alice")])));
        assert_eq!(principal, Some(Principal::new("alice")));
        assert_eq!(
            tokio_test::block_on(resolver.resolve_session(&HeaderMap::new())),
            None
        );
    }

    #[tokio::test]
    async fn test_session_token_resolver() {
        let db = test_db().await;
        seed_user(&db, "alice").await;
        seed_session(&db, "alice", "secret", DateTime::now().millis() + 60_000).await;

        let resolver = SessionTokenResolver::new(db.users());
        let principal = resolver
            .resolve_session(&headers(&[("Authorization", "Bearer secret")]))
            .await;
        assert_eq!(principal, Some(Principal::new("alice")));

        let anonymous = resolver
            .resolve_session(&headers(&[("Authorization", "Bearer wrong")]))
            .await;
        assert_eq!(anonymous, None);

        // A gateway header is not a session
        let spoofed = resolver
            .resolve_session(&headers(&[(USER_ID_HEADER, "alice")]))
            .await;
        assert_eq!(spoofed, None);
    }

    #[tokio::test]
    async fn test_graphql_handler_injects_principal() {
        let db = test_db().await;
        seed_user(&db, "alice").await;
        let schema = crate::schema::build_schema(&db);
        let resolver: Arc<dyn SessionResolver> = Arc::new(HeaderSessionResolver);

        let Json(response) = graphql_handler(
            Extension(schema),
            Extension(db.clone()),
            Extension(resolver),
            headers(&[(USER_ID_HEADER, "alice")]),
            Json(Request::new("{ viewer { __typename ... on User { email } } }")),
        )
        .await;

        assert!(response.errors.is_empty());
        let data = response.data.into_json().unwrap();
        assert_eq!(data["viewer"]["email"], "alice@example.com");
    }
}
