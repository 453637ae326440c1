//! DataLoader utilities for batch loading
//!
//! Relation fields (`Todo.categories`, `Category.todos`) are resolved through
//! per-request loaders that are bound to the request's principal, so every
//! batch query is owner-scoped and results never outlive the request.

use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::models::{Category, Todo};
use crate::storage::{CategoryStorage, TodoStorage};

/// Batch loader trait for loading multiple items at once
#[async_trait]
pub trait BatchLoader<K, V>: Send + Sync
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
{
    /// Load batch of items by keys
    ///
    /// This method should fetch all items for the given keys in a single
    /// database query to avoid N+1 problems.
    async fn load_batch(&self, keys: &[K]) -> HashMap<K, V>;
}

/// DataLoader with caching and batching
pub struct DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    loader: Arc<L>,
    cache: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V, L> DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    /// Create new DataLoader with a batch loader
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load a single item by key
    pub async fn load(&self, key: K) -> Option<V> {
        let mut results = self.load_many(vec![key.clone()]).await;
        results.remove(&key)
    }

    /// Load multiple items by keys
    ///
    /// Keys already cached are served from the cache; the rest are loaded in
    /// one batch.
    pub async fn load_many(&self, keys: Vec<K>) -> HashMap<K, V> {
        let mut result = HashMap::new();
        let mut uncached_keys = Vec::new();

        {
            let cache = self.cache.lock().await;
            for key in keys {
                if let Some(value) = cache.get(&key) {
                    result.insert(key, value.clone());
                } else if !uncached_keys.contains(&key) {
                    uncached_keys.push(key);
                }
            }
        }

        if !uncached_keys.is_empty() {
            let batch_results = self.loader.load_batch(&uncached_keys).await;

            let mut cache = self.cache.lock().await;
            for (k, v) in batch_results {
                cache.insert(k.clone(), v.clone());
                result.insert(k, v);
            }
        }

        result
    }
}

impl<K, V, L> Clone for DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            cache: self.cache.clone(),
        }
    }
}

/// Group `(key, value)` pairs, giving every requested key an entry
fn group_by_key<V>(keys: &[String], pairs: Vec<(String, V)>) -> HashMap<String, Vec<V>> {
    let mut grouped: HashMap<String, Vec<V>> =
        keys.iter().map(|k| (k.clone(), Vec::new())).collect();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }
    grouped
}

/// Categories of todos, keyed by todo id
pub struct TodoCategoriesBatch {
    storage: CategoryStorage,
    owner_id: String,
}

impl TodoCategoriesBatch {
    pub fn new(storage: CategoryStorage, owner_id: impl Into<String>) -> Self {
        Self {
            storage,
            owner_id: owner_id.into(),
        }
    }
}

#[async_trait]
impl BatchLoader<String, Vec<Category>> for TodoCategoriesBatch {
    async fn load_batch(&self, keys: &[String]) -> HashMap<String, Vec<Category>> {
        match self.storage.find_by_todos(&self.owner_id, keys).await {
            Ok(pairs) => group_by_key(keys, pairs),
            Err(e) => {
                warn!(error = %e, "Failed to load categories for {} todos", keys.len());
                HashMap::new()
            }
        }
    }
}

/// Todos of categories, keyed by category id
pub struct CategoryTodosBatch {
    storage: TodoStorage,
    owner_id: String,
}

impl CategoryTodosBatch {
    pub fn new(storage: TodoStorage, owner_id: impl Into<String>) -> Self {
        Self {
            storage,
            owner_id: owner_id.into(),
        }
    }
}

#[async_trait]
impl BatchLoader<String, Vec<Todo>> for CategoryTodosBatch {
    async fn load_batch(&self, keys: &[String]) -> HashMap<String, Vec<Todo>> {
        match self.storage.find_by_categories(&self.owner_id, keys).await {
            Ok(pairs) => group_by_key(keys, pairs),
            Err(e) => {
                warn!(error = %e, "Failed to load todos for {} categories", keys.len());
                HashMap::new()
            }
        }
    }
}

pub type TodoCategoriesLoader = DataLoader<String, Vec<Category>, TodoCategoriesBatch>;
pub type CategoryTodosLoader = DataLoader<String, Vec<Todo>, CategoryTodosBatch>;
