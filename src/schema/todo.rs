use async_graphql::{ComplexObject, Context, Object, ID};

use super::services;
use crate::auth::current_principal;
use crate::dataloaders::TodoCategoriesLoader;
use crate::errors::{TodoDeleteResult, TodoListResult, TodoResult};
use crate::models::{Category, Todo, TodoCreateInput, TodoFilterInput, TodoUpdateInput};
use crate::ownership::require_ownership;
use crate::pagination::PaginationInput;

#[ComplexObject]
impl Todo {
    /// Categories assigned to this todo
    async fn categories(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Category>> {
        if !require_ownership(current_principal(ctx), &self.owner_id) {
            return Ok(Vec::new());
        }
        let loader = ctx.data::<TodoCategoriesLoader>()?;
        Ok(loader.load(self.id.to_string()).await.unwrap_or_default())
    }
}

#[derive(Default)]
pub struct TodoQuery;

#[Object]
impl TodoQuery {
    /// The caller's todos, newest first
    async fn todos(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<String>,
        last: Option<i32>,
        before: Option<String>,
        filter: Option<TodoFilterInput>,
    ) -> async_graphql::Result<TodoListResult> {
        let pagination = PaginationInput {
            first,
            after,
            last,
            before,
        };
        let result = services(ctx)?
            .todos
            .list_todos(current_principal(ctx), pagination, filter)
            .await;

        let wants_categories = ctx
            .look_ahead()
            .field("connection")
            .field("edges")
            .field("node")
            .field("categories")
            .exists();
        if wants_categories {
            if let Some(loader) = ctx.data_opt::<TodoCategoriesLoader>() {
                let ids = result
                    .connection
                    .edges
                    .iter()
                    .map(|e| e.node.id.to_string())
                    .collect();
                loader.load_many(ids).await;
            }
        }

        Ok(result)
    }

    async fn todo_by_id(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<TodoResult> {
        Ok(services(ctx)?
            .todos
            .get_todo_by_id(current_principal(ctx), &id)
            .await)
    }
}

#[derive(Default)]
pub struct TodoMutation;

#[Object]
impl TodoMutation {
    async fn create_todo(
        &self,
        ctx: &Context<'_>,
        todo: TodoCreateInput,
    ) -> async_graphql::Result<TodoResult> {
        Ok(services(ctx)?
            .todos
            .create_todo(current_principal(ctx), todo)
            .await)
    }

    async fn update_todo(
        &self,
        ctx: &Context<'_>,
        todo: TodoUpdateInput,
    ) -> async_graphql::Result<TodoResult> {
        Ok(services(ctx)?
            .todos
            .update_todo(current_principal(ctx), todo)
            .await)
    }

    async fn delete_todo(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<TodoDeleteResult> {
        Ok(services(ctx)?
            .todos
            .delete_todo(current_principal(ctx), &id)
            .await)
    }

    /// Deletes each id independently; one result per id, in order
    async fn bulk_delete_todos(
        &self,
        ctx: &Context<'_>,
        ids: Vec<ID>,
    ) -> async_graphql::Result<Vec<TodoDeleteResult>> {
        Ok(services(ctx)?
            .todos
            .bulk_delete_todos(current_principal(ctx), &ids)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::execute;
    use super::super::build_schema;
    use crate::test_support::{assign, seed_category, seed_todo, test_db};
    use serde_json::json;

    const PAGE: &str = r#"
        query Page($first: Int, $after: String, $last: Int, $before: String) {
            todos(first: $first, after: $after, last: $last, before: $before) {
                connection {
                    edges { cursor node { title categories { name } } }
                    pageInfo { hasNextPage hasPreviousPage startCursor endCursor }
                    totalCount
                }
                error { __typename code message }
            }
        }"#;

    #[tokio::test]
    async fn test_todos_connection_with_categories() {
        let db = test_db().await;
        let schema = build_schema(&db);
        let work = seed_category(&db, "alice", "Work").await;
        let report = seed_todo(&db, "alice", "Report", 1_000).await;
        seed_todo(&db, "alice", "Laundry", 2_000).await;
        seed_todo(&db, "alice", "Dishes", 3_000).await;
        assign(&db, &report, &work).await;

        let data = execute(&schema, &db, Some("alice"), PAGE, json!({ "first": 2 })).await;
        let todos = &data["todos"];
        assert!(todos["error"].is_null());
        let conn = &todos["connection"];
        assert_eq!(conn["totalCount"], 3);
        assert_eq!(conn["edges"][0]["node"]["title"], "Dishes");
        assert_eq!(conn["edges"][1]["node"]["title"], "Laundry");
        assert_eq!(conn["pageInfo"]["hasNextPage"], true);
        assert_eq!(conn["pageInfo"]["hasPreviousPage"], false);

        let after = conn["pageInfo"]["endCursor"].clone();
        let data = execute(
            &schema,
            &db,
            Some("alice"),
            PAGE,
            json!({ "first": 2, "after": after }),
        )
        .await;
        let conn = &data["todos"]["connection"];
        assert_eq!(conn["edges"][0]["node"]["title"], "Report");
        assert_eq!(conn["edges"][0]["node"]["categories"][0]["name"], "Work");
        assert_eq!(conn["pageInfo"]["hasNextPage"], false);
        assert_eq!(conn["pageInfo"]["hasPreviousPage"], true);

        // Walk back from the last page
        let before = conn["pageInfo"]["startCursor"].clone();
        let data = execute(
            &schema,
            &db,
            Some("alice"),
            PAGE,
            json!({ "last": 1, "before": before }),
        )
        .await;
        let conn = &data["todos"]["connection"];
        assert_eq!(conn["edges"][0]["node"]["title"], "Laundry");
        assert_eq!(conn["pageInfo"]["hasPreviousPage"], true);
        assert_eq!(conn["pageInfo"]["hasNextPage"], true);
    }

    #[tokio::test]
    async fn test_todos_without_session() {
        let db = test_db().await;
        let schema = build_schema(&db);
        seed_todo(&db, "alice", "Report", 1_000).await;

        let data = execute(&schema, &db, None, PAGE, json!({})).await;
        let todos = &data["todos"];
        assert_eq!(todos["connection"]["edges"], json!([]));
        assert_eq!(todos["connection"]["totalCount"], 0);
        assert_eq!(todos["error"]["__typename"], "UnauthorizedError");
        assert_eq!(todos["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_filter_by_category_and_completed() {
        let db = test_db().await;
        let schema = build_schema(&db);
        let work = seed_category(&db, "alice", "Work").await;
        let report = seed_todo(&db, "alice", "Report", 1_000).await;
        seed_todo(&db, "alice", "Laundry", 2_000).await;
        assign(&db, &report, &work).await;

        let data = execute(
            &schema,
            &db,
            Some("alice"),
            r#"query Filtered($filter: TodoFilterInput) {
                todos(filter: $filter) {
                    connection { edges { node { title } } totalCount }
                }
            }"#,
            json!({ "filter": { "categoryIds": [work.id.as_str()], "completed": false } }),
        )
        .await;
        let conn = &data["todos"]["connection"];
        assert_eq!(conn["totalCount"], 1);
        assert_eq!(conn["edges"][0]["node"]["title"], "Report");
    }

    #[tokio::test]
    async fn test_bulk_delete_mutation() {
        let db = test_db().await;
        let schema = build_schema(&db);
        let mine = seed_todo(&db, "alice", "Mine", 1_000).await;
        let theirs = seed_todo(&db, "bob", "Theirs", 2_000).await;

        let data = execute(
            &schema,
            &db,
            Some("alice"),
            r#"mutation Bulk($ids: [ID!]!) {
                bulkDeleteTodos(ids: $ids) {
                    __typename
                    ... on Todo { title }
                    ... on NotFoundError { resourceId resourceType }
                }
            }"#,
            json!({ "ids": [mine.id.as_str(), theirs.id.as_str()] }),
        )
        .await;
        let results = &data["bulkDeleteTodos"];
        assert_eq!(results[0]["__typename"], "Todo");
        assert_eq!(results[0]["title"], "Mine");
        assert_eq!(results[1]["__typename"], "NotFoundError");
        assert_eq!(results[1]["resourceType"], "Todo");
        assert_eq!(results[1]["resourceId"], theirs.id.as_str());
    }

    #[tokio::test]
    async fn test_update_todo_clears_due_date() {
        let db = test_db().await;
        let schema = build_schema(&db);
        let todo = seed_todo(&db, "alice", "Taxes", 1_000).await;

        let data = execute(
            &schema,
            &db,
            Some("alice"),
            r#"mutation Update($todo: TodoUpdateInput!) {
                updateTodo(todo: $todo) { __typename ... on Todo { dueDate completed } }
            }"#,
            json!({ "todo": { "id": todo.id.as_str(), "dueDate": "2026-04-15T00:00:00Z" } }),
        )
        .await;
        assert_eq!(data["updateTodo"]["dueDate"], "2026-04-15T00:00:00+00:00");

        let data = execute(
            &schema,
            &db,
            Some("alice"),
            r#"mutation Update($todo: TodoUpdateInput!) {
                updateTodo(todo: $todo) { __typename ... on Todo { dueDate completed } }
            }"#,
            json!({ "todo": { "id": todo.id.as_str(), "dueDate": null } }),
        )
        .await;
        assert!(data["updateTodo"]["dueDate"].is_null());
        assert_eq!(data["updateTodo"]["completed"], false);
    }
}
