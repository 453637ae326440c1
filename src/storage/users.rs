//! Read-only access to users and sessions managed by the auth service

use async_graphql::ID;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::{timestamp, StorageResult};
use crate::models::User;
use crate::types::DateTime;

#[derive(Debug, Clone)]
pub struct UserStorage {
    pool: SqlitePool,
}

impl UserStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: &str) -> StorageResult<Option<User>> {
        debug!("Fetching user: {}", id);

        let row = sqlx::query(
            "SELECT id, name, email, email_verified, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(User {
                id: ID(r.try_get("id")?),
                name: r.try_get("name")?,
                email: r.try_get("email")?,
                email_verified: r.try_get("email_verified")?,
                created_at: timestamp(&r, "created_at")?,
                updated_at: timestamp(&r, "updated_at")?,
            })),
            None => Ok(None),
        }
    }

    /// User id of a session token that has not expired at `now`
    pub async fn session_user_id(
        &self,
        token: &str,
        now: DateTime,
    ) -> StorageResult<Option<String>> {
        let user_id: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM sessions WHERE token = ? AND expires_at > ?")
                .bind(token)
                .bind(now.millis())
                .fetch_optional(&self.pool)
                .await?;
        Ok(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_session, seed_user, test_db};

    #[tokio::test]
    async fn test_find_user() {
        let db = test_db().await;
        seed_user(&db, "alice").await;

        let user = db.users().find("alice").await.unwrap().unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(!user.email_verified);
        assert!(db.users().find("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_ignored() {
        let db = test_db().await;
        seed_user(&db, "alice").await;
        let now = DateTime::now();
        seed_session(&db, "alice", "live-token", now.millis() + 60_000).await;
        seed_session(&db, "alice", "stale-token", now.millis() - 1).await;

        let users = db.users();
        assert_eq!(
            users.session_user_id("live-token", now).await.unwrap(),
            Some("alice".to_string())
        );
        assert_eq!(users.session_user_id("stale-token", now).await.unwrap(), None);
        assert_eq!(users.session_user_id("unknown", now).await.unwrap(), None);
    }
}
