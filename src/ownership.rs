//! Principal and ownership checks

use crate::errors::ApiError;

/// Authenticated caller resolved from the session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Principal {
    pub user_id: String,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Does the principal own an entity with this owner id?
pub fn require_ownership(principal: Option<&Principal>, owner_id: &str) -> bool {
    principal.is_some_and(|p| p.user_id == owner_id)
}

/// The principal, or an UnauthorizedError naming the attempted operation
pub fn require_principal<'a>(
    principal: Option<&'a Principal>,
    operation: &str,
) -> Result<&'a Principal, ApiError> {
    principal.ok_or_else(|| ApiError::unauthorized(operation))
}
