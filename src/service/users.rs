//! The signed-in user

use crate::errors::{ApiError, UserResult};
use crate::models::{User, USER};
use crate::ownership::{require_principal, Principal};
use crate::storage::{Database, UserStorage};

#[derive(Debug, Clone)]
pub struct UserService {
    users: UserStorage,
}

impl UserService {
    pub fn new(db: &Database) -> Self {
        Self { users: db.users() }
    }

    pub async fn viewer(&self, principal: Option<&Principal>) -> UserResult {
        self.find(principal).await.into()
    }

    async fn find(&self, principal: Option<&Principal>) -> Result<User, ApiError> {
        let principal = require_principal(principal, "get viewer")?;
        self.users
            .find(&principal.user_id)
            .await
            .map_err(|e| ApiError::from_storage(e, "get viewer", None))?
            .ok_or_else(|| ApiError::not_found(principal.user_id.as_str(), USER))
    }
}
