//! Todo operations

use async_graphql::ID;
use futures::future::join_all;
use tracing::debug;

use super::distinct_ids;
use crate::errors::{ApiError, TodoDeleteResult, TodoListResult, TodoResult};
use crate::filter::TodoFilter;
use crate::models::{Todo, TodoCreateInput, TodoFilterInput, TodoUpdateInput, CATEGORY, TODO};
use crate::ownership::{require_principal, Principal};
use crate::pagination::{paginate, Connection, PaginationInput};
use crate::storage::{CategoryStorage, Database, TodoPageSource, TodoStorage};
use crate::validation::{validate_todo_create, validate_todo_update};

fn title_conflict(title: &str) -> (&'static str, String) {
    ("title", format!("A todo with title '{}' already exists", title))
}

#[derive(Debug, Clone)]
pub struct TodoService {
    todos: TodoStorage,
    categories: CategoryStorage,
}

impl TodoService {
    pub fn new(db: &Database) -> Self {
        Self {
            todos: db.todos(),
            categories: db.categories(),
        }
    }

    /// One page of the caller's todos.
    ///
    /// Always returns a connection; failures leave it empty and set `error`.
    pub async fn list_todos(
        &self,
        principal: Option<&Principal>,
        pagination: PaginationInput,
        filter: Option<TodoFilterInput>,
    ) -> TodoListResult {
        match self.page(principal, &pagination, filter).await {
            Ok(connection) => TodoListResult::ok(connection),
            Err(err) => TodoListResult::failed(err),
        }
    }

    async fn page(
        &self,
        principal: Option<&Principal>,
        pagination: &PaginationInput,
        filter: Option<TodoFilterInput>,
    ) -> Result<Connection<Todo>, ApiError> {
        let principal = require_principal(principal, "list todos")?;
        pagination.validate()?;

        let filter = TodoFilter::compose(&principal.user_id, filter);
        let request = pagination.page_request();
        let source = TodoPageSource::new(&self.todos, &filter);

        paginate(&source, &request)
            .await
            .map_err(|e| ApiError::from_storage(e, "list todos", None))
    }

    pub async fn get_todo_by_id(&self, principal: Option<&Principal>, id: &ID) -> TodoResult {
        self.find(principal, id).await.into()
    }

    async fn find(&self, principal: Option<&Principal>, id: &ID) -> Result<Todo, ApiError> {
        let principal = require_principal(principal, "get todo")?;
        self.owned(&principal.user_id, id, "get todo").await
    }

    async fn owned(&self, owner_id: &str, id: &ID, action: &str) -> Result<Todo, ApiError> {
        self.todos
            .find_owned(id.as_str(), owner_id)
            .await
            .map_err(|e| ApiError::from_storage(e, action, None))?
            .ok_or_else(|| ApiError::not_found(id.as_str(), TODO))
    }

    pub async fn create_todo(
        &self,
        principal: Option<&Principal>,
        input: TodoCreateInput,
    ) -> TodoResult {
        self.create(principal, input).await.into()
    }

    async fn create(
        &self,
        principal: Option<&Principal>,
        mut input: TodoCreateInput,
    ) -> Result<Todo, ApiError> {
        let principal = require_principal(principal, "create todo")?;
        input.title = input.title.trim().to_string();
        validate_todo_create(&input)?;

        let owner_id = principal.user_id.as_str();
        if let Some(ids) = &input.category_ids {
            self.require_categories(owner_id, ids).await?;
        }
        self.require_unique_title(owner_id, &input.title, None).await?;

        let todo = self
            .todos
            .create(owner_id, &input)
            .await
            .map_err(|e| {
                ApiError::from_storage(e, "create todo", Some(title_conflict(&input.title)))
            })?;
        debug!("Created todo {} for {}", todo.id.as_str(), owner_id);
        Ok(todo)
    }

    pub async fn update_todo(
        &self,
        principal: Option<&Principal>,
        input: TodoUpdateInput,
    ) -> TodoResult {
        self.update(principal, input).await.into()
    }

    async fn update(
        &self,
        principal: Option<&Principal>,
        mut input: TodoUpdateInput,
    ) -> Result<Todo, ApiError> {
        let principal = require_principal(principal, "update todo")?;
        input.title = input.title.map(|t| t.trim().to_string());
        validate_todo_update(&input)?;

        let owner_id = principal.user_id.as_str();
        self.owned(owner_id, &input.id, "update todo").await?;
        if let Some(ids) = &input.category_ids {
            self.require_categories(owner_id, ids).await?;
        }
        if let Some(title) = &input.title {
            self.require_unique_title(owner_id, title, Some(input.id.as_str()))
                .await?;
        }

        let conflict = input.title.as_deref().map(title_conflict);
        self.todos
            .update(owner_id, &input)
            .await
            .map_err(|e| ApiError::from_storage(e, "update todo", conflict))?
            .ok_or_else(|| ApiError::not_found(input.id.as_str(), TODO))
    }

    pub async fn delete_todo(&self, principal: Option<&Principal>, id: &ID) -> TodoDeleteResult {
        self.delete(principal, id).await.into()
    }

    /// Delete each id independently; outcomes follow input order
    pub async fn bulk_delete_todos(
        &self,
        principal: Option<&Principal>,
        ids: &[ID],
    ) -> Vec<TodoDeleteResult> {
        join_all(ids.iter().map(|id| self.delete(principal, id)))
            .await
            .into_iter()
            .map(TodoDeleteResult::from)
            .collect()
    }

    async fn delete(&self, principal: Option<&Principal>, id: &ID) -> Result<Todo, ApiError> {
        let principal = require_principal(principal, "delete todo")?;
        let owner_id = principal.user_id.as_str();
        let todo = self.owned(owner_id, id, "delete todo").await?;

        let removed = self
            .todos
            .delete(id.as_str(), owner_id)
            .await
            .map_err(|e| ApiError::from_storage(e, "delete todo", None))?;
        if !removed {
            return Err(ApiError::not_found(id.as_str(), TODO));
        }
        Ok(todo)
    }

    /// Every referenced category must belong to the owner
    async fn require_categories(&self, owner_id: &str, ids: &[ID]) -> Result<(), ApiError> {
        let wanted = distinct_ids(ids);
        let owned = self
            .categories
            .owned_ids(owner_id, &wanted)
            .await
            .map_err(|e| ApiError::from_storage(e, "check categories", None))?;

        match wanted.into_iter().find(|id| !owned.contains(id)) {
            Some(missing) => Err(ApiError::not_found(missing, CATEGORY)),
            None => Ok(()),
        }
    }

    async fn require_unique_title(
        &self,
        owner_id: &str,
        title: &str,
        exclude_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let taken = self
            .todos
            .title_taken(owner_id, title, exclude_id)
            .await
            .map_err(|e| ApiError::from_storage(e, "check todo title", None))?;
        if taken {
            let (field, message) = title_conflict(title);
            return Err(ApiError::conflict(message, field));
        }
        Ok(())
    }
}
