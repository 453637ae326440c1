//! Category storage

use async_graphql::{MaybeUndefined, ID};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use super::{timestamp, StorageError, StorageResult};
use crate::models::{Category, CategoryCreateInput, CategoryUpdateInput};
use crate::types::DateTime;

const CATEGORY_COLUMNS: &str = "categories.id, categories.name, categories.description, \
     categories.color, categories.owner_id, categories.created_at, categories.updated_at";

#[derive(Debug, Clone)]
pub struct CategoryStorage {
    pool: SqlitePool,
}

impl CategoryStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All categories of an owner, by name
    pub async fn list(&self, owner_id: &str) -> StorageResult<Vec<Category>> {
        debug!("Fetching categories for owner {}", owner_id);

        let rows = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE owner_id = ? ORDER BY name ASC",
            CATEGORY_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_category).collect()
    }

    /// Get a category by id, scoped to its owner
    pub async fn find_owned(&self, id: &str, owner_id: &str) -> StorageResult<Option<Category>> {
        debug!("Fetching category {} for owner {}", id, owner_id);

        let row = sqlx::query(&format!(
            "SELECT {} FROM categories WHERE id = ? AND owner_id = ?",
            CATEGORY_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_category(&r)).transpose()
    }

    /// Which of `ids` belong to the owner
    pub async fn owned_ids(&self, owner_id: &str, ids: &[String]) -> StorageResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM categories WHERE owner_id = ");
        qb.push_bind(owner_id.to_string());
        qb.push(" AND id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        qb.push(")");

        let owned: Vec<String> = qb.build_query_scalar().fetch_all(&self.pool).await?;
        Ok(owned)
    }

    /// Whether the owner already has a category with this name, other than `exclude_id`
    pub async fn name_taken(
        &self,
        owner_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> StorageResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM categories WHERE owner_id = ? AND name = ? AND id != ?)",
        )
        .bind(owner_id)
        .bind(name)
        .bind(exclude_id.unwrap_or(""))
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    pub async fn create(
        &self,
        owner_id: &str,
        input: &CategoryCreateInput,
    ) -> StorageResult<Category> {
        let now = DateTime::now();
        let category = Category {
            id: ID(nanoid::nanoid!()),
            name: input.name.clone(),
            description: input.description.clone(),
            color: input.color.clone(),
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(
            "Creating category: {} (name: {})",
            category.id.as_str(),
            category.name
        );

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, color, owner_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(category.id.as_str())
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.color)
        .bind(&category.owner_id)
        .bind(category.created_at.millis())
        .bind(category.updated_at.millis())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from_sqlx)?;

        Ok(category)
    }

    /// Apply a partial update to an owned category.
    ///
    /// Returns `None` when no category with this id belongs to the owner.
    pub async fn update(
        &self,
        owner_id: &str,
        input: &CategoryUpdateInput,
    ) -> StorageResult<Option<Category>> {
        let id = input.id.as_str();
        debug!("Updating category: {}", id);

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE categories SET updated_at = ");
        qb.push_bind(DateTime::now().millis());

        if let Some(name) = &input.name {
            qb.push(", name = ");
            qb.push_bind(name.clone());
        }
        push_nullable(&mut qb, "description", &input.description);
        push_nullable(&mut qb, "color", &input.color);

        qb.push(" WHERE id = ");
        qb.push_bind(id.to_string());
        qb.push(" AND owner_id = ");
        qb.push_bind(owner_id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(StorageError::from_sqlx)?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_owned(id, owner_id).await
    }

    /// Delete an owned category; assignments cascade.
    ///
    /// Returns whether a row was removed.
    pub async fn delete(&self, id: &str, owner_id: &str) -> StorageResult<bool> {
        debug!("Deleting category: {}", id);

        let result = sqlx::query("DELETE FROM categories WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Categories assigned to any of `todo_ids`, paired with the todo id, by name
    pub async fn find_by_todos(
        &self,
        owner_id: &str,
        todo_ids: &[String],
    ) -> StorageResult<Vec<(String, Category)>> {
        if todo_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT tc.todo_id AS link_id, {} FROM todo_categories tc \
             JOIN categories ON categories.id = tc.category_id \
             WHERE categories.owner_id = ",
            CATEGORY_COLUMNS
        ));
        qb.push_bind(owner_id.to_string());
        qb.push(" AND tc.todo_id IN (");
        let mut ids = qb.separated(", ");
        for id in todo_ids {
            ids.push_bind(id.clone());
        }
        qb.push(") ORDER BY categories.name ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> StorageResult<(String, Category)> {
                Ok((row.try_get::<String, _>("link_id")?, row_to_category(row)?))
            })
            .collect()
    }
}

fn push_nullable(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, value: &MaybeUndefined<String>) {
    match value {
        MaybeUndefined::Value(v) => {
            qb.push(format!(", {} = ", column));
            qb.push_bind(Some(v.clone()));
        }
        MaybeUndefined::Null => {
            qb.push(format!(", {} = ", column));
            qb.push_bind(None::<String>);
        }
        MaybeUndefined::Undefined => {}
    }
}

/// Convert a database row to a Category
fn row_to_category(row: &SqliteRow) -> StorageResult<Category> {
    Ok(Category {
        id: ID(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        color: row.try_get("color")?,
        owner_id: row.try_get("owner_id")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}
