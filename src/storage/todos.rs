//! Todo storage

use async_graphql::{MaybeUndefined, ID};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use super::{optional_timestamp, timestamp, StorageError, StorageResult};
use crate::filter::{fold_title, push_anchor, TodoFilter};
use crate::models::{Todo, TodoCreateInput, TodoUpdateInput};
use crate::pagination::{Anchor, Direction, KeysetSource};
use crate::types::DateTime;

const TODO_COLUMNS: &str =
    "todos.id, todos.title, todos.content, todos.completed, todos.due_date, todos.owner_id, \
     todos.created_at, todos.updated_at";

#[derive(Debug, Clone)]
pub struct TodoStorage {
    pool: SqlitePool,
}

impl TodoStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a todo by id, scoped to its owner
    pub async fn find_owned(&self, id: &str, owner_id: &str) -> StorageResult<Option<Todo>> {
        debug!("Fetching todo {} for owner {}", id, owner_id);

        let row = sqlx::query(&format!(
            "SELECT {} FROM todos WHERE id = ? AND owner_id = ?",
            TODO_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_todo(&r)).transpose()
    }

    /// Whether the owner already has a todo with this title, other than `exclude_id`
    pub async fn title_taken(
        &self,
        owner_id: &str,
        title: &str,
        exclude_id: Option<&str>,
    ) -> StorageResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM todos WHERE owner_id = ? AND title = ? AND id != ?)",
        )
        .bind(owner_id)
        .bind(title)
        .bind(exclude_id.unwrap_or(""))
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    /// Up to `limit` rows matching `filter`, past `anchor`, in `direction` order
    pub async fn find_page(
        &self,
        filter: &TodoFilter,
        direction: Direction,
        anchor: Option<&Anchor>,
        limit: i64,
    ) -> StorageResult<Vec<Todo>> {
        debug!(
            "Fetching todo page (owner: {}, direction: {:?}, anchored: {}, limit: {})",
            filter.owner_id,
            direction,
            anchor.is_some(),
            limit
        );

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM todos", TODO_COLUMNS));
        filter.push_where(&mut qb);
        if let Some(anchor) = anchor {
            push_anchor(&mut qb, direction, anchor);
        }
        qb.push(" ORDER BY ");
        qb.push(direction.order_by());
        qb.push(" LIMIT ");
        qb.push_bind(limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_todo).collect()
    }

    /// Whether any row matching `filter` lies past `anchor` in `direction`
    pub async fn exists_past(
        &self,
        filter: &TodoFilter,
        direction: Direction,
        anchor: &Anchor,
    ) -> StorageResult<bool> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT EXISTS (SELECT 1 FROM todos");
        filter.push_where(&mut qb);
        push_anchor(&mut qb, direction, anchor);
        qb.push(")");

        let exists: bool = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(exists)
    }

    pub async fn count(&self, filter: &TodoFilter) -> StorageResult<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM todos");
        filter.push_where(&mut qb);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Insert a todo and its category assignments atomically
    pub async fn create(&self, owner_id: &str, input: &TodoCreateInput) -> StorageResult<Todo> {
        let now = DateTime::now();
        let todo = Todo {
            id: ID(nanoid::nanoid!()),
            title: input.title.clone(),
            content: input.content.clone().unwrap_or_default(),
            completed: input.completed.unwrap_or(false),
            due_date: input.due_date,
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!("Creating todo: {} (title: {})", todo.id.as_str(), todo.title);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO todos (id, title, title_folded, content, completed, due_date, owner_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(todo.id.as_str())
        .bind(&todo.title)
        .bind(fold_title(&todo.title))
        .bind(&todo.content)
        .bind(todo.completed)
        .bind(todo.due_date.map(|d| d.millis()))
        .bind(&todo.owner_id)
        .bind(todo.created_at.millis())
        .bind(todo.updated_at.millis())
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from_sqlx)?;

        if let Some(category_ids) = &input.category_ids {
            assign_categories(&mut tx, todo.id.as_str(), category_ids, todo.created_at).await?;
        }

        tx.commit().await?;
        Ok(todo)
    }

    /// Apply a partial update to an owned todo.
    ///
    /// Returns `None` when no todo with this id belongs to the owner.
    pub async fn update(
        &self,
        owner_id: &str,
        input: &TodoUpdateInput,
    ) -> StorageResult<Option<Todo>> {
        let id = input.id.as_str();
        debug!("Updating todo: {}", id);

        let now = DateTime::now();
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE todos SET updated_at = ");
        qb.push_bind(now.millis());

        if let Some(title) = &input.title {
            qb.push(", title = ");
            qb.push_bind(title.clone());
            qb.push(", title_folded = ");
            qb.push_bind(fold_title(title));
        }
        if let Some(content) = &input.content {
            qb.push(", content = ");
            qb.push_bind(content.clone());
        }
        if let Some(completed) = input.completed {
            qb.push(", completed = ");
            qb.push_bind(completed);
        }
        match &input.due_date {
            MaybeUndefined::Value(due) => {
                qb.push(", due_date = ");
                qb.push_bind(Some(due.millis()));
            }
            MaybeUndefined::Null => {
                qb.push(", due_date = ");
                qb.push_bind(None::<i64>);
            }
            MaybeUndefined::Undefined => {}
        }

        qb.push(" WHERE id = ");
        qb.push_bind(id.to_string());
        qb.push(" AND owner_id = ");
        qb.push_bind(owner_id.to_string());

        let mut tx = self.pool.begin().await?;

        let result = qb
            .build()
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from_sqlx)?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(category_ids) = &input.category_ids {
            sqlx::query("DELETE FROM todo_categories WHERE todo_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            assign_categories(&mut tx, id, category_ids, now).await?;
        }

        tx.commit().await?;
        self.find_owned(id, owner_id).await
    }

    /// Delete an owned todo; assignments cascade.
    ///
    /// Returns whether a row was removed.
    pub async fn delete(&self, id: &str, owner_id: &str) -> StorageResult<bool> {
        debug!("Deleting todo: {}", id);

        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Todos assigned to any of `category_ids`, paired with the category id,
    /// newest first
    pub async fn find_by_categories(
        &self,
        owner_id: &str,
        category_ids: &[String],
    ) -> StorageResult<Vec<(String, Todo)>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT tc.category_id AS link_id, {} FROM todo_categories tc \
             JOIN todos ON todos.id = tc.todo_id \
             WHERE todos.owner_id = ",
            TODO_COLUMNS
        ));
        qb.push_bind(owner_id.to_string());
        qb.push(" AND tc.category_id IN (");
        let mut ids = qb.separated(", ");
        for id in category_ids {
            ids.push_bind(id.clone());
        }
        qb.push(") ORDER BY ");
        qb.push(Direction::Forward.order_by());

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> StorageResult<(String, Todo)> {
                Ok((row.try_get::<String, _>("link_id")?, row_to_todo(row)?))
            })
            .collect()
    }
}

async fn assign_categories(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    todo_id: &str,
    category_ids: &[ID],
    assigned_at: DateTime,
) -> StorageResult<()> {
    if category_ids.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT OR IGNORE INTO todo_categories (todo_id, category_id, assigned_at) ",
    );
    qb.push_values(category_ids, |mut b, category_id| {
        b.push_bind(todo_id.to_string())
            .push_bind(category_id.to_string())
            .push_bind(assigned_at.millis());
    });
    qb.build()
        .execute(&mut **tx)
        .await
        .map_err(StorageError::from_sqlx)?;
    Ok(())
}

/// Convert a database row to a Todo
fn row_to_todo(row: &SqliteRow) -> StorageResult<Todo> {
    Ok(Todo {
        id: ID(row.try_get("id")?),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        completed: row.try_get("completed")?,
        due_date: optional_timestamp(row, "due_date")?,
        owner_id: row.try_get("owner_id")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

/// Keyset source over one owner's filtered todos
pub struct TodoPageSource<'a> {
    storage: &'a TodoStorage,
    filter: &'a TodoFilter,
}

impl<'a> TodoPageSource<'a> {
    pub fn new(storage: &'a TodoStorage, filter: &'a TodoFilter) -> Self {
        Self { storage, filter }
    }
}

#[async_trait]
impl KeysetSource<Todo> for TodoPageSource<'_> {
    type Error = StorageError;

    async fn fetch(
        &self,
        direction: Direction,
        anchor: Option<&Anchor>,
        limit: i64,
    ) -> StorageResult<Vec<Todo>> {
        self.storage
            .find_page(self.filter, direction, anchor, limit)
            .await
    }

    async fn exists_past(&self, direction: Direction, anchor: &Anchor) -> StorageResult<bool> {
        self.storage
            .exists_past(self.filter, direction, anchor)
            .await
    }

    async fn count(&self) -> StorageResult<i64> {
        self.storage.count(self.filter).await
    }
}
