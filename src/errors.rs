//! Result and error envelopes shared by every operation
//!
//! Resolvers never surface expected failures as GraphQL errors. Each failure
//! is an [`ApiError`] internally and is converted into the matching member of
//! the operation's result union at the boundary.

use async_graphql::{Interface, SimpleObject, Union, ID};
use thiserror::Error;
use tracing::error;

use crate::models::{Category, Todo, User};
use crate::pagination::Connection;
use crate::storage::StorageError;

pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
pub const CONFLICT: &str = "CONFLICT";
pub const SERVER_ERROR: &str = "SERVER_ERROR";

/// A single failed field constraint
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
    pub code: String,
    /// First failing field
    pub field: Option<String>,
    pub fields: Vec<FieldViolation>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct NotFoundError {
    pub message: String,
    pub code: String,
    pub resource_id: ID,
    pub resource_type: String,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedError {
    pub message: String,
    pub code: String,
    pub operation: String,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct ConflictError {
    pub message: String,
    pub code: String,
    pub conflicting_field: Option<String>,
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub message: String,
    pub code: String,
    /// Underlying cause, for diagnostics only
    pub details: Option<String>,
}

/// The `Error` interface implemented by every error payload
#[derive(Interface, Debug, Clone, PartialEq, Eq)]
#[graphql(
    name = "Error",
    field(name = "message", ty = "&String"),
    field(name = "code", ty = "&String")
)]
pub enum ErrorPayload {
    Validation(ValidationError),
    NotFound(NotFoundError),
    Unauthorized(UnauthorizedError),
    Conflict(ConflictError),
    Server(ServerError),
}

/// Expected failure of an operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldViolation>),

    #[error("{resource_type} with id {resource_id} not found")]
    NotFound {
        resource_id: String,
        resource_type: &'static str,
    },

    #[error("Unauthorized to perform {0}")]
    Unauthorized(String),

    #[error("{message}")]
    Conflict {
        message: String,
        field: Option<&'static str>,
    },

    #[error("{message}")]
    Server {
        message: String,
        details: Option<String>,
    },
}

impl ApiError {
    pub fn not_found(resource_id: impl Into<String>, resource_type: &'static str) -> Self {
        ApiError::NotFound {
            resource_id: resource_id.into(),
            resource_type,
        }
    }

    pub fn unauthorized(operation: impl Into<String>) -> Self {
        ApiError::Unauthorized(operation.into())
    }

    pub fn conflict(message: impl Into<String>, field: &'static str) -> Self {
        ApiError::Conflict {
            message: message.into(),
            field: Some(field),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(vec![FieldViolation::new(field, message)])
    }

    /// Unexpected failure; the cause is logged and kept as `details`
    pub fn server(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        let message = message.into();
        let details = cause.to_string();
        error!(details = %details, "{}", message);
        ApiError::Server {
            message,
            details: Some(details),
        }
    }

    /// Map a storage failure, turning uniqueness violations into conflicts
    pub fn from_storage(
        err: StorageError,
        action: &str,
        conflict: Option<(&'static str, String)>,
    ) -> Self {
        match (err, conflict) {
            (StorageError::UniqueViolation(_), Some((field, message))) => {
                ApiError::conflict(message, field)
            }
            (err, _) => ApiError::server(format!("Failed to {}", action), err),
        }
    }

    pub fn into_payload(self) -> ErrorPayload {
        match self {
            ApiError::Validation(fields) => {
                let first = fields.first();
                ErrorPayload::Validation(ValidationError {
                    message: first
                        .map(|f| f.message.clone())
                        .unwrap_or_else(|| "Validation error".to_string()),
                    code: VALIDATION_ERROR.to_string(),
                    field: first.map(|f| f.field.clone()),
                    fields,
                })
            }
            ApiError::NotFound {
                resource_id,
                resource_type,
            } => ErrorPayload::NotFound(NotFoundError {
                message: format!("{} with id {} not found", resource_type, resource_id),
                code: NOT_FOUND.to_string(),
                resource_id: ID(resource_id),
                resource_type: resource_type.to_string(),
            }),
            ApiError::Unauthorized(operation) => ErrorPayload::Unauthorized(UnauthorizedError {
                message: format!("Unauthorized to perform {}", operation),
                code: UNAUTHORIZED.to_string(),
                operation,
            }),
            ApiError::Conflict { message, field } => ErrorPayload::Conflict(ConflictError {
                message,
                code: CONFLICT.to_string(),
                conflicting_field: field.map(str::to_string),
            }),
            ApiError::Server { message, details } => ErrorPayload::Server(ServerError {
                message,
                code: SERVER_ERROR.to_string(),
                details,
            }),
        }
    }
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Pagination { field, message } => ApiError::invalid(field, message),
            crate::Error::InvalidCursor(reason) => ApiError::invalid("cursor", reason),
            crate::Error::Storage(e) => ApiError::from_storage(e, "access storage", None),
            crate::Error::Config(e) => ApiError::server("Invalid configuration", e),
        }
    }
}

impl From<ApiError> for ErrorPayload {
    fn from(err: ApiError) -> Self {
        err.into_payload()
    }
}

#[derive(Union, Debug, Clone, PartialEq)]
pub enum TodoResult {
    Todo(Todo),
    ValidationError(ValidationError),
    NotFoundError(NotFoundError),
    UnauthorizedError(UnauthorizedError),
    ConflictError(ConflictError),
    ServerError(ServerError),
}

#[derive(Union, Debug, Clone, PartialEq)]
pub enum TodoDeleteResult {
    Todo(Todo),
    ValidationError(ValidationError),
    NotFoundError(NotFoundError),
    UnauthorizedError(UnauthorizedError),
    ServerError(ServerError),
}

#[derive(Union, Debug, Clone, PartialEq)]
pub enum CategoryResult {
    Category(Category),
    ValidationError(ValidationError),
    NotFoundError(NotFoundError),
    UnauthorizedError(UnauthorizedError),
    ConflictError(ConflictError),
    ServerError(ServerError),
}

#[derive(Union, Debug, Clone, PartialEq)]
pub enum CategoryDeleteResult {
    Category(Category),
    ValidationError(ValidationError),
    NotFoundError(NotFoundError),
    UnauthorizedError(UnauthorizedError),
    ServerError(ServerError),
}

#[derive(Union, Debug, Clone, PartialEq)]
pub enum UserResult {
    User(User),
    NotFoundError(NotFoundError),
    UnauthorizedError(UnauthorizedError),
    ServerError(ServerError),
}

/// A todo page, and the error that emptied it if any
#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct TodoListResult {
    pub connection: Connection<Todo>,
    pub error: Option<ErrorPayload>,
}

impl TodoListResult {
    pub fn ok(connection: Connection<Todo>) -> Self {
        Self {
            connection,
            error: None,
        }
    }

    pub fn failed(err: ApiError) -> Self {
        Self {
            connection: Connection::empty(),
            error: Some(err.into_payload()),
        }
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct CategoryListResult {
    pub items: Vec<Category>,
    pub total_count: i64,
    pub error: Option<ErrorPayload>,
}

impl CategoryListResult {
    pub fn ok(items: Vec<Category>) -> Self {
        Self {
            total_count: items.len() as i64,
            items,
            error: None,
        }
    }

    pub fn failed(err: ApiError) -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            error: Some(err.into_payload()),
        }
    }
}

/// Wire `Result<T, ApiError>` into a result union.
///
/// Unions without a conflict member report conflicts as server errors, and
/// unions without a validation member do the same for validation failures.
macro_rules! envelope {
    ($union:ident, $ok:ident, conflict: $conflict:tt, validation: $validation:tt) => {
        impl From<Result<$ok, ApiError>> for $union {
            fn from(result: Result<$ok, ApiError>) -> Self {
                match result {
                    Ok(value) => $union::$ok(value),
                    Err(err) => err.into(),
                }
            }
        }

        impl From<ApiError> for $union {
            fn from(err: ApiError) -> Self {
                match err.into_payload() {
                    ErrorPayload::Validation(e) => envelope!(@validation $union, $validation, e),
                    ErrorPayload::NotFound(e) => $union::NotFoundError(e),
                    ErrorPayload::Unauthorized(e) => $union::UnauthorizedError(e),
                    ErrorPayload::Conflict(e) => envelope!(@conflict $union, $conflict, e),
                    ErrorPayload::Server(e) => $union::ServerError(e),
                }
            }
        }
    };
    (@conflict $union:ident, true, $e:ident) => {
        $union::ConflictError($e)
    };
    (@conflict $union:ident, false, $e:ident) => {
        $union::ServerError(ServerError {
            message: $e.message,
            code: SERVER_ERROR.to_string(),
            details: None,
        })
    };
    (@validation $union:ident, true, $e:ident) => {
        $union::ValidationError($e)
    };
    (@validation $union:ident, false, $e:ident) => {
        $union::ServerError(ServerError {
            message: $e.message,
            code: SERVER_ERROR.to_string(),
            details: None,
        })
    };
}

envelope!(TodoResult, Todo, conflict: true, validation: true);
envelope!(TodoDeleteResult, Todo, conflict: false, validation: true);
envelope!(CategoryResult, Category, conflict: true, validation: true);
envelope!(CategoryDeleteResult, Category, conflict: false, validation: true);
envelope!(UserResult, User, conflict: false, validation: false);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_payload_mirrors_first_field() {
        let err = ApiError::Validation(vec![
            FieldViolation::new("title", "Title is required"),
            FieldViolation::new("categoryIds", "Invalid category id"),
        ]);
        let ErrorPayload::Validation(payload) = err.into_payload() else {
            panic!("expected validation payload");
        };
        assert_eq!(payload.code, VALIDATION_ERROR);
        assert_eq!(payload.field.as_deref(), Some("title"));
        assert_eq!(payload.message, "Title is required");
        assert_eq!(payload.fields.len(), 2);
    }

    #[test]
    fn test_not_found_payload() {
        let payload = ApiError::not_found("abc", "Todo").into_payload();
        assert_eq!(
            payload,
            ErrorPayload::NotFound(NotFoundError {
                message: "Todo with id abc not found".to_string(),
                code: NOT_FOUND.to_string(),
                resource_id: ID("abc".to_string()),
                resource_type: "Todo".to_string(),
            })
        );
    }

    #[test]
    fn test_unauthorized_payload() {
        let ErrorPayload::Unauthorized(payload) =
            ApiError::unauthorized("create todo").into_payload()
        else {
            panic!("expected unauthorized payload");
        };
        assert_eq!(payload.message, "Unauthorized to perform create todo");
        assert_eq!(payload.operation, "create todo");
        assert_eq!(payload.code, UNAUTHORIZED);
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err = ApiError::from_storage(
            StorageError::UniqueViolation("todos.owner_id, todos.title".to_string()),
            "create todo",
            Some(("title", "A todo with this title already exists".to_string())),
        );
        assert_eq!(
            err,
            ApiError::conflict("A todo with this title already exists", "title")
        );
    }

    #[test]
    fn test_other_storage_errors_map_to_server() {
        let err = ApiError::from_storage(
            StorageError::InvalidData("bad timestamp".to_string()),
            "fetch todos",
            None,
        );
        let ErrorPayload::Server(payload) = err.into_payload() else {
            panic!("expected server payload");
        };
        assert_eq!(payload.message, "Failed to fetch todos");
        assert_eq!(payload.code, SERVER_ERROR);
        assert!(payload.details.unwrap().contains("bad timestamp"));
    }

    #[test]
    fn test_pagination_errors_become_validation() {
        let err: ApiError = crate::Error::Pagination {
            field: "last",
            message: "Cannot specify both 'first' and 'last'".to_string(),
        }
        .into();
        assert_eq!(
            err,
            ApiError::invalid("last", "Cannot specify both 'first' and 'last'")
        );
    }

    #[test]
    fn test_failed_list_keeps_empty_container() {
        let result = TodoListResult::failed(ApiError::unauthorized("list todos"));
        assert!(result.connection.edges.is_empty());
        assert_eq!(result.connection.total_count, 0);
        assert!(!result.connection.page_info.has_next_page);
        assert!(matches!(result.error, Some(ErrorPayload::Unauthorized(_))));

        let result = CategoryListResult::failed(ApiError::unauthorized("list categories"));
        assert!(result.items.is_empty());
        assert_eq!(result.total_count, 0);
    }

    #[test]
    fn test_delete_union_reports_conflict_as_server_error() {
        let result: TodoDeleteResult = ApiError::conflict("dup", "title").into();
        assert_eq!(
            result,
            TodoDeleteResult::ServerError(ServerError {
                message: "dup".to_string(),
                code: SERVER_ERROR.to_string(),
                details: None,
            })
        );

        let result: TodoResult = ApiError::conflict("dup", "title").into();
        assert!(matches!(result, TodoResult::ConflictError(_)));
    }

    #[test]
    fn test_user_union_reports_validation_as_server_error() {
        let err = ApiError::Validation(vec![FieldViolation::new("email", "bad email")]);
        match UserResult::from(err) {
            UserResult::ServerError(e) => {
                assert_eq!(e.code, SERVER_ERROR);
                assert_eq!(e.details, None);
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }
}
