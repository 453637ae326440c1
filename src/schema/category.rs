use async_graphql::{ComplexObject, Context, Object, ID};

use super::services;
use crate::auth::current_principal;
use crate::dataloaders::CategoryTodosLoader;
use crate::errors::{CategoryDeleteResult, CategoryListResult, CategoryResult};
use crate::models::{Category, CategoryCreateInput, CategoryUpdateInput, Todo};
use crate::ownership::require_ownership;

#[ComplexObject]
impl Category {
    /// Todos assigned to this category, newest first
    async fn todos(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Todo>> {
        if !require_ownership(current_principal(ctx), &self.owner_id) {
            return Ok(Vec::new());
        }
        let loader = ctx.data::<CategoryTodosLoader>()?;
        Ok(loader.load(self.id.to_string()).await.unwrap_or_default())
    }
}

#[derive(Default)]
pub struct CategoryQuery;

#[Object]
impl CategoryQuery {
    /// The caller's categories, by name
    async fn categories(&self, ctx: &Context<'_>) -> async_graphql::Result<CategoryListResult> {
        let result = services(ctx)?
            .categories
            .list_categories(current_principal(ctx))
            .await;

        if ctx.look_ahead().field("items").field("todos").exists() {
            if let Some(loader) = ctx.data_opt::<CategoryTodosLoader>() {
                let ids = result.items.iter().map(|c| c.id.to_string()).collect();
                loader.load_many(ids).await;
            }
        }

        Ok(result)
    }

    async fn category_by_id(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<CategoryResult> {
        Ok(services(ctx)?
            .categories
            .get_category_by_id(current_principal(ctx), &id)
            .await)
    }
}

#[derive(Default)]
pub struct CategoryMutation;

#[Object]
impl CategoryMutation {
    async fn create_category(
        &self,
        ctx: &Context<'_>,
        category: CategoryCreateInput,
    ) -> async_graphql::Result<CategoryResult> {
        Ok(services(ctx)?
            .categories
            .create_category(current_principal(ctx), category)
            .await)
    }

    async fn update_category(
        &self,
        ctx: &Context<'_>,
        category: CategoryUpdateInput,
    ) -> async_graphql::Result<CategoryResult> {
        Ok(services(ctx)?
            .categories
            .update_category(current_principal(ctx), category)
            .await)
    }

    async fn delete_category(
        &self,
        ctx: &Context<'_>,
        id: ID,
    ) -> async_graphql::Result<CategoryDeleteResult> {
        Ok(services(ctx)?
            .categories
            .delete_category(current_principal(ctx), &id)
            .await)
    }

    async fn bulk_delete_categories(
        &self,
        ctx: &Context<'_>,
        ids: Vec<ID>,
    ) -> async_graphql::Result<Vec<CategoryDeleteResult>> {
        Ok(services(ctx)?
            .categories
            .bulk_delete_categories(current_principal(ctx), &ids)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::super::build_schema;
    use super::super::tests::execute;
    use crate::test_support::{assign, seed_category, seed_todo, test_db};
    use serde_json::json;

    #[tokio::test]
    async fn test_categories_with_todos() {
        let db = test_db().await;
        let schema = build_schema(&db);
        let work = seed_category(&db, "alice", "Work").await;
        seed_category(&db, "alice", "Chores").await;
        seed_category(&db, "bob", "Bob only").await;
        let report = seed_todo(&db, "alice", "Report", 1_000).await;
        let slides = seed_todo(&db, "alice", "Slides", 2_000).await;
        assign(&db, &report, &work).await;
        assign(&db, &slides, &work).await;

        let data = execute(
            &schema,
            &db,
            Some("alice"),
            "{ categories { items { name todos { title } } totalCount error { code } } }",
            json!({}),
        )
        .await;
        let categories = &data["categories"];
        assert!(categories["error"].is_null());
        assert_eq!(categories["totalCount"], 2);
        assert_eq!(categories["items"][0]["name"], "Chores");
        assert_eq!(categories["items"][0]["todos"], json!([]));
        assert_eq!(categories["items"][1]["name"], "Work");
        assert_eq!(
            categories["items"][1]["todos"],
            json!([{ "title": "Slides" }, { "title": "Report" }])
        );
    }

    #[tokio::test]
    async fn test_create_category_conflict() {
        let db = test_db().await;
        let schema = build_schema(&db);
        seed_category(&db, "alice", "Work").await;

        let data = execute(
            &schema,
            &db,
            Some("alice"),
            r#"mutation Create($category: CategoryCreateInput!) {
                createCategory(category: $category) {
                    __typename
                    ... on ConflictError { code conflictingField }
                }
            }"#,
            json!({ "category": { "name": "Work" } }),
        )
        .await;
        assert_eq!(data["createCategory"]["__typename"], "ConflictError");
        assert_eq!(data["createCategory"]["code"], "CONFLICT");
        assert_eq!(data["createCategory"]["conflictingField"], "name");
    }

    #[tokio::test]
    async fn test_delete_category_without_session() {
        let db = test_db().await;
        let schema = build_schema(&db);
        let work = seed_category(&db, "alice", "Work").await;

        let data = execute(
            &schema,
            &db,
            None,
            r#"mutation Delete($id: ID!) {
                deleteCategory(id: $id) {
                    __typename
                    ... on UnauthorizedError { operation }
                }
            }"#,
            json!({ "id": work.id.as_str() }),
        )
        .await;
        assert_eq!(data["deleteCategory"]["__typename"], "UnauthorizedError");
        assert_eq!(data["deleteCategory"]["operation"], "delete category");
    }
}
