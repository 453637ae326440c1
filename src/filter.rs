//! Filter composition for todo listings
//!
//! Builds the owner-scoped base predicate and the keyset anchor predicate as
//! parameterised SQL on a [`QueryBuilder`]. Criteria that are absent are
//! elided entirely rather than rendered as always-true comparisons.

use sqlx::{QueryBuilder, Sqlite};

use crate::models::TodoFilterInput;
use crate::pagination::{Anchor, Direction};

/// Case folding applied to titles on write and to the title criterion.
///
/// SQLite's `lower()` only folds ASCII, so folding happens here instead.
pub fn fold_title(title: &str) -> String {
    title.to_lowercase()
}

/// Base predicate for todo queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoFilter {
    pub owner_id: String,
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub category_ids: Vec<String>,
}

impl TodoFilter {
    /// Only the ownership constraint
    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            title: None,
            completed: None,
            category_ids: Vec::new(),
        }
    }

    /// Merge user supplied criteria into the owner scope
    pub fn compose(owner_id: impl Into<String>, input: Option<TodoFilterInput>) -> Self {
        let mut filter = Self::for_owner(owner_id);
        if let Some(input) = input {
            filter.title = input.title.filter(|t| !t.is_empty());
            filter.completed = input.completed;
            filter.category_ids = input
                .category_ids
                .unwrap_or_default()
                .into_iter()
                .map(|id| id.0)
                .collect();
        }
        filter
    }

    /// Append ` WHERE ...` for this filter
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push(" WHERE owner_id = ");
        qb.push_bind(self.owner_id.clone());

        if let Some(title) = &self.title {
            qb.push(" AND instr(title_folded, ");
            qb.push_bind(fold_title(title));
            qb.push(") > 0");
        }

        if let Some(completed) = self.completed {
            qb.push(" AND completed = ");
            qb.push_bind(completed);
        }

        if !self.category_ids.is_empty() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM todo_categories tc \
                 WHERE tc.todo_id = todos.id AND tc.category_id IN (",
            );
            let mut ids = qb.separated(", ");
            for id in &self.category_ids {
                ids.push_bind(id.clone());
            }
            qb.push("))");
        }
    }
}

/// Append ` AND (...)` restricting rows to those strictly past `anchor`
/// when walking in `direction`.
///
/// Forward walks `created_at DESC, id DESC`, so "past" means older, with a
/// smaller id among rows sharing the anchor's timestamp. Backward inverts
/// both comparisons.
pub fn push_anchor(qb: &mut QueryBuilder<'_, Sqlite>, direction: Direction, anchor: &Anchor) {
    let cmp = match direction {
        Direction::Forward => "<",
        Direction::Backward => ">",
    };
    let millis = anchor.created_at.millis();

    qb.push(format!(" AND (created_at {} ", cmp));
    qb.push_bind(millis);
    qb.push(" OR (created_at = ");
    qb.push_bind(millis);
    qb.push(format!(" AND id {} ", cmp));
    qb.push_bind(anchor.id.clone());
    qb.push("))");
}
