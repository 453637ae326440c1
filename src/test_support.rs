//! Fixtures shared by unit tests

use async_graphql::ID;

use crate::models::{Category, Todo};
use crate::storage::Database;
use crate::types::DateTime;

pub async fn test_db() -> Database {
    Database::in_memory().await.unwrap()
}

/// Insert a todo with a fixed creation time
pub async fn seed_todo(db: &Database, owner_id: &str, title: &str, created_at: i64) -> Todo {
    let id = nanoid::nanoid!();
    sqlx::query(
        "INSERT INTO todos (id, title, title_folded, content, completed, owner_id, created_at, updated_at) \
         VALUES (?, ?, ?, '', 0, ?, ?, ?)",
    )
    .bind(&id)
    .bind(title)
    .bind(crate::filter::fold_title(title))
    .bind(owner_id)
    .bind(created_at)
    .bind(created_at)
    .execute(db.pool())
    .await
    .unwrap();

    let at = DateTime::from_millis(created_at).unwrap();
    Todo {
        id: ID(id),
        title: title.to_string(),
        content: String::new(),
        completed: false,
        due_date: None,
        owner_id: owner_id.to_string(),
        created_at: at,
        updated_at: at,
    }
}

pub async fn seed_category(db: &Database, owner_id: &str, name: &str) -> Category {
    let id = nanoid::nanoid!();
    let now = DateTime::now();
    sqlx::query(
        "INSERT INTO categories (id, name, owner_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(owner_id)
    .bind(now.millis())
    .bind(now.millis())
    .execute(db.pool())
    .await
    .unwrap();

    Category {
        id: ID(id),
        name: name.to_string(),
        description: None,
        color: None,
        owner_id: owner_id.to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub async fn assign(db: &Database, todo: &Todo, category: &Category) {
    sqlx::query("INSERT INTO todo_categories (todo_id, category_id, assigned_at) VALUES (?, ?, 0)")
        .bind(todo.id.as_str())
        .bind(category.id.as_str())
        .execute(db.pool())
        .await
        .unwrap();
}

pub async fn seed_user(db: &Database, id: &str) {
    let now = DateTime::now().millis();
    sqlx::query(
        "INSERT INTO users (id, email, name, email_verified, created_at, updated_at) \
         VALUES (?, ?, ?, 0, ?, ?)",
    )
    .bind(id)
    .bind(format!("{}@example.com", id))
    .bind(id.to_uppercase())
    .bind(now)
    .bind(now)
    .execute(db.pool())
    .await
    .unwrap();
}

pub async fn seed_session(db: &Database, user_id: &str, token: &str, expires_at: i64) {
    sqlx::query(
        "INSERT INTO sessions (id, token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(nanoid::nanoid!())
    .bind(token)
    .bind(user_id)
    .bind(expires_at)
    .bind(DateTime::now().millis())
    .execute(db.pool())
    .await
    .unwrap();
}
