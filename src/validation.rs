//! Input validation
//!
//! Each check collects every failing field so a single ValidationError can
//! report all of them at once.

use async_graphql::ID;

use crate::errors::{ApiError, FieldViolation};
use crate::models::{CategoryCreateInput, CategoryUpdateInput, TodoCreateInput, TodoUpdateInput};

const NANOID_LEN: usize = 21;

/// Whether `id` has the shape of a generated entity id
pub fn is_nanoid(id: &str) -> bool {
    id.len() == NANOID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn check_id(violations: &mut Vec<FieldViolation>, field: &str, id: &ID, message: &str) {
    if !is_nanoid(id) {
        violations.push(FieldViolation::new(field, message));
    }
}

fn check_ids(violations: &mut Vec<FieldViolation>, field: &str, ids: Option<&Vec<ID>>) {
    for (i, id) in ids.into_iter().flatten().enumerate() {
        if !is_nanoid(id) {
            violations.push(FieldViolation::new(
                format!("{}.{}", field, i),
                format!("Invalid id '{}'", id.as_str()),
            ));
        }
    }
}

fn check_required(violations: &mut Vec<FieldViolation>, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        violations.push(FieldViolation::new(field, message));
    }
}

fn finish(violations: Vec<FieldViolation>) -> Result<(), ApiError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(violations))
    }
}

pub fn validate_todo_create(input: &TodoCreateInput) -> Result<(), ApiError> {
    let mut violations = Vec::new();
    check_required(&mut violations, "title", &input.title, "Title is required");
    check_ids(&mut violations, "categoryIds", input.category_ids.as_ref());
    finish(violations)
}

pub fn validate_todo_update(input: &TodoUpdateInput) -> Result<(), ApiError> {
    let mut violations = Vec::new();
    check_id(&mut violations, "id", &input.id, "Invalid todo id");
    if let Some(title) = &input.title {
        check_required(&mut violations, "title", title, "Title cannot be empty");
    }
    check_ids(&mut violations, "categoryIds", input.category_ids.as_ref());
    finish(violations)
}

pub fn validate_category_create(input: &CategoryCreateInput) -> Result<(), ApiError> {
    let mut violations = Vec::new();
    check_required(
        &mut violations,
        "name",
        &input.name,
        "Name for category is required",
    );
    finish(violations)
}

pub fn validate_category_update(input: &CategoryUpdateInput) -> Result<(), ApiError> {
    let mut violations = Vec::new();
    check_id(
        &mut violations,
        "id",
        &input.id,
        "Id for category is required",
    );
    if let Some(name) = &input.name {
        check_required(&mut violations, "name", name, "Name cannot be empty");
    }
    finish(violations)
}
