//! Category operations

use async_graphql::ID;
use futures::future::join_all;
use tracing::debug;

use crate::errors::{ApiError, CategoryDeleteResult, CategoryListResult, CategoryResult};
use crate::models::{Category, CategoryCreateInput, CategoryUpdateInput, CATEGORY};
use crate::ownership::{require_principal, Principal};
use crate::storage::{CategoryStorage, Database};
use crate::validation::{validate_category_create, validate_category_update};

fn name_conflict(name: &str) -> (&'static str, String) {
    ("name", format!("A category with name '{}' already exists", name))
}

#[derive(Debug, Clone)]
pub struct CategoryService {
    categories: CategoryStorage,
}

impl CategoryService {
    pub fn new(db: &Database) -> Self {
        Self {
            categories: db.categories(),
        }
    }

    /// All of the caller's categories, by name
    pub async fn list_categories(&self, principal: Option<&Principal>) -> CategoryListResult {
        match self.list(principal).await {
            Ok(items) => CategoryListResult::ok(items),
            Err(err) => CategoryListResult::failed(err),
        }
    }

    async fn list(&self, principal: Option<&Principal>) -> Result<Vec<Category>, ApiError> {
        let principal = require_principal(principal, "list categories")?;
        self.categories
            .list(&principal.user_id)
            .await
            .map_err(|e| ApiError::from_storage(e, "list categories", None))
    }

    pub async fn get_category_by_id(
        &self,
        principal: Option<&Principal>,
        id: &ID,
    ) -> CategoryResult {
        self.find(principal, id).await.into()
    }

    async fn find(&self, principal: Option<&Principal>, id: &ID) -> Result<Category, ApiError> {
        let principal = require_principal(principal, "get category")?;
        self.owned(&principal.user_id, id, "get category").await
    }

    async fn owned(&self, owner_id: &str, id: &ID, action: &str) -> Result<Category, ApiError> {
        self.categories
            .find_owned(id.as_str(), owner_id)
            .await
            .map_err(|e| ApiError::from_storage(e, action, None))?
            .ok_or_else(|| ApiError::not_found(id.as_str(), CATEGORY))
    }

    pub async fn create_category(
        &self,
        principal: Option<&Principal>,
        input: CategoryCreateInput,
    ) -> CategoryResult {
        self.create(principal, input).await.into()
    }

    async fn create(
        &self,
        principal: Option<&Principal>,
        mut input: CategoryCreateInput,
    ) -> Result<Category, ApiError> {
        let principal = require_principal(principal, "create category")?;
        input.name = input.name.trim().to_string();
        validate_category_create(&input)?;

        let owner_id = principal.user_id.as_str();
        self.require_unique_name(owner_id, &input.name, None).await?;

        let category = self
            .categories
            .create(owner_id, &input)
            .await
            .map_err(|e| {
                ApiError::from_storage(e, "create category", Some(name_conflict(&input.name)))
            })?;
        debug!("Created category {} for {}", category.id.as_str(), owner_id);
        Ok(category)
    }

    pub async fn update_category(
        &self,
        principal: Option<&Principal>,
        input: CategoryUpdateInput,
    ) -> CategoryResult {
        self.update(principal, input).await.into()
    }

    async fn update(
        &self,
        principal: Option<&Principal>,
        mut input: CategoryUpdateInput,
    ) -> Result<Category, ApiError> {
        let principal = require_principal(principal, "update category")?;
        input.name = input.name.map(|n| n.trim().to_string());
        validate_category_update(&input)?;

        let owner_id = principal.user_id.as_str();
        self.owned(owner_id, &input.id, "update category").await?;
        if let Some(name) = &input.name {
            self.require_unique_name(owner_id, name, Some(input.id.as_str()))
                .await?;
        }

        let conflict = input.name.as_deref().map(name_conflict);
        self.categories
            .update(owner_id, &input)
            .await
            .map_err(|e| ApiError::from_storage(e, "update category", conflict))?
            .ok_or_else(|| ApiError::not_found(input.id.as_str(), CATEGORY))
    }

    pub async fn delete_category(
        &self,
        principal: Option<&Principal>,
        id: &ID,
    ) -> CategoryDeleteResult {
        self.delete(principal, id).await.into()
    }

    /// Delete each id independently; outcomes follow input order
    pub async fn bulk_delete_categories(
        &self,
        principal: Option<&Principal>,
        ids: &[ID],
    ) -> Vec<CategoryDeleteResult> {
        join_all(ids.iter().map(|id| self.delete(principal, id)))
            .await
            .into_iter()
            .map(CategoryDeleteResult::from)
            .collect()
    }

    async fn delete(&self, principal: Option<&Principal>, id: &ID) -> Result<Category, ApiError> {
        let principal = require_principal(principal, "delete category")?;
        let owner_id = principal.user_id.as_str();
        let category = self.owned(owner_id, id, "delete category").await?;

        let removed = self
            .categories
            .delete(id.as_str(), owner_id)
            .await
            .map_err(|e| ApiError::from_storage(e, "delete category", None))?;
        if !removed {
            return Err(ApiError::not_found(id.as_str(), CATEGORY));
        }
        Ok(category)
    }

    async fn require_unique_name(
        &self,
        owner_id: &str,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<(), ApiError> {
        let taken = self
            .categories
            .name_taken(owner_id, name, exclude_id)
            .await
            .map_err(|e| ApiError::from_storage(e, "check category name", None))?;
        if taken {
            let (field, message) = name_conflict(name);
            return Err(ApiError::conflict(message, field));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorPayload;
    use crate::test_support::{assign, seed_category, seed_todo, test_db};
    use async_graphql::MaybeUndefined;

    fn alice() -> Principal {
        Principal::new("alice")
    }

    fn create_input(name: &str) -> CategoryCreateInput {
        CategoryCreateInput {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_owner_scoped() {
        let db = test_db().await;
        let service = CategoryService::new(&db);
        seed_category(&db, "alice", "Work").await;
        seed_category(&db, "alice", "Errands").await;
        seed_category(&db, "bob", "Gym").await;

        let result = service.list_categories(Some(&alice())).await;
        assert!(result.error.is_none());
        assert_eq!(result.total_count, 2);
        let names: Vec<&str> = result.items.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Errands", "Work"]);
    }

    #[tokio::test]
    async fn test_list_without_principal() {
        let db = test_db().await;
        let service = CategoryService::new(&db);

        let result = service.list_categories(None).await;
        assert!(result.items.is_empty());
        assert!(matches!(result.error, Some(ErrorPayload::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_create_and_conflict() {
        let db = test_db().await;
        let service = CategoryService::new(&db);

        let input = CategoryCreateInput {
            name: " Work ".to_string(),
            description: Some("Office things".to_string()),
            color: Some("#ff0000".to_string()),
        };
        let CategoryResult::Category(work) = service.create_category(Some(&alice()), input).await
        else {
            panic!("expected category");
        };
        assert_eq!(work.name, "Work");
        assert_eq!(work.color.as_deref(), Some("#ff0000"));

        let CategoryResult::ConflictError(err) = service
            .create_category(Some(&alice()), create_input("Work"))
            .await
        else {
            panic!("expected conflict");
        };
        assert_eq!(err.conflicting_field.as_deref(), Some("name"));
        assert_eq!(err.message, "A category with name 'Work' already exists");

        assert!(matches!(
            service
                .create_category(Some(&Principal::new("bob")), create_input("Work"))
                .await,
            CategoryResult::Category(_)
        ));
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let db = test_db().await;
        let service = CategoryService::new(&db);

        let CategoryResult::ValidationError(err) =
            service.create_category(Some(&alice()), create_input("")).await
        else {
            panic!("expected validation error");
        };
        assert_eq!(err.field.as_deref(), Some("name"));
        assert_eq!(err.message, "Name for category is required");
    }

    #[tokio::test]
    async fn test_update_clears_nullable_fields() {
        let db = test_db().await;
        let service = CategoryService::new(&db);
        let CategoryResult::Category(work) = service
            .create_category(
                Some(&alice()),
                CategoryCreateInput {
                    name: "Work".to_string(),
                    description: Some("Office".to_string()),
                    color: Some("blue".to_string()),
                },
            )
            .await
        else {
            panic!("expected category");
        };

        let input = CategoryUpdateInput {
            id: work.id.clone(),
            name: Some("Work".to_string()),
            description: MaybeUndefined::Null,
            color: MaybeUndefined::Undefined,
        };
        let CategoryResult::Category(updated) =
            service.update_category(Some(&alice()), input).await
        else {
            panic!("expected category");
        };
        assert_eq!(updated.description, None);
        assert_eq!(updated.color.as_deref(), Some("blue"));
    }

    #[tokio::test]
    async fn test_update_foreign_category_is_not_found() {
        let db = test_db().await;
        let service = CategoryService::new(&db);
        let gym = seed_category(&db, "bob", "Gym").await;

        let input = CategoryUpdateInput {
            id: gym.id.clone(),
            name: Some("Mine now".to_string()),
            description: MaybeUndefined::Undefined,
            color: MaybeUndefined::Undefined,
        };
        let CategoryResult::NotFoundError(err) =
            service.update_category(Some(&alice()), input).await
        else {
            panic!("expected not found");
        };
        assert_eq!(err.resource_type, "Category");
    }

    #[tokio::test]
    async fn test_bulk_delete_categories() {
        let db = test_db().await;
        let service = CategoryService::new(&db);
        let work = seed_category(&db, "alice", "Work").await;
        let gym = seed_category(&db, "bob", "Gym").await;
        let todo = seed_todo(&db, "alice", "Report", 1_000).await;
        assign(&db, &todo, &work).await;

        let results = service
            .bulk_delete_categories(Some(&alice()), &[gym.id.clone(), work.id.clone()])
            .await;
        assert!(matches!(&results[0], CategoryDeleteResult::NotFoundError(_)));
        assert_eq!(results[1], CategoryDeleteResult::Category(work));

        // The todo survives its category
        assert!(db
            .todos()
            .find_owned(todo.id.as_str(), "alice")
            .await
            .unwrap()
            .is_some());

        let anonymous = service
            .bulk_delete_categories(None, &[gym.id.clone()])
            .await;
        assert!(matches!(
            &anonymous[0],
            CategoryDeleteResult::UnauthorizedError(_)
        ));
    }
}
