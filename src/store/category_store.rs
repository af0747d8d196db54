//! The reactive category store.
//!
//! Mirrors the expense store's three-phase mutation discipline but keeps the
//! cache sorted by name, matching the repository's ordering, so merged rows
//! land where a re-fetch would put them.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use time::OffsetDateTime;
use tokio::sync::watch;

use crate::{
    Error,
    category::{Category, CategoryId, NewCategory},
    repository::CategoryRepository,
    store::SyncStrategy,
};

/// Identifies a cached category row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryKey {
    /// A row confirmed by the database, keyed by its real ID.
    Persisted(CategoryId),
    /// A provisional row awaiting reconciliation, keyed by a local counter.
    Pending(u64),
}

/// One cached category row with its cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedCategory {
    /// The cache key, persisted or pending.
    pub key: CategoryKey,
    /// The cached category row.
    pub category: Category,
}

/// A snapshot of the category cache published to subscribers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryState {
    /// All cached categories, sorted by name ascending.
    pub categories: Vec<CachedCategory>,
    /// Whether a fetch or mutation is in flight.
    pub loading: bool,
    /// The last mutation failure, cleared when a new operation starts.
    pub error: Option<String>,
}

impl CategoryState {
    fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    fn finish(&mut self) {
        self.loading = false;
    }

    fn set_all(&mut self, categories: Vec<Category>) {
        self.categories = categories
            .into_iter()
            .map(|category| CachedCategory {
                key: CategoryKey::Persisted(category.id),
                category,
            })
            .collect();
    }

    fn insert(&mut self, key: CategoryKey, category: Category) {
        self.categories.push(CachedCategory { key, category });
        self.sort();
    }

    fn remove(&mut self, key: CategoryKey) -> bool {
        let before = self.categories.len();
        self.categories.retain(|cached| cached.key != key);
        self.categories.len() != before
    }

    /// Merge a confirmed update. Applies only if the row is still cached, so
    /// an update settling after a delete does not resurrect the row.
    fn apply_updated(&mut self, category: Category) -> bool {
        let key = CategoryKey::Persisted(category.id);

        if !self.remove(key) {
            return false;
        }
        self.insert(key, category);

        true
    }

    fn sort(&mut self) {
        self.categories
            .sort_by(|a, b| a.category.name.as_ref().cmp(b.category.name.as_ref()));
    }
}

/// A reactive cache of categories backed by a [CategoryRepository].
pub struct CategoryStore {
    repository: Arc<dyn CategoryRepository>,
    strategy: SyncStrategy,
    state: watch::Sender<CategoryState>,
    next_pending_id: AtomicU64,
}

impl CategoryStore {
    /// Create a store over the given repository.
    pub fn new(repository: Arc<dyn CategoryRepository>, strategy: SyncStrategy) -> Self {
        let (state, _) = watch::channel(CategoryState::default());

        Self {
            repository,
            strategy,
            state,
            next_pending_id: AtomicU64::new(1),
        }
    }

    /// Subscribe to state snapshots.
    pub fn subscribe(&self) -> watch::Receiver<CategoryState> {
        self.state.subscribe()
    }

    /// The current state snapshot.
    pub fn state(&self) -> CategoryState {
        self.state.borrow().clone()
    }

    /// Re-fetch the category list from the repository.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.transition(CategoryState::begin);
        self.refetch()
    }

    /// Create a category and merge it into the cache.
    ///
    /// # Errors
    ///
    /// Propagates repository errors, including
    /// [Error::DuplicateCategoryName]. The cache is restored on failure.
    pub async fn add(&self, fields: NewCategory) -> Result<Category, Error> {
        let pending_key = match self.strategy {
            SyncStrategy::Optimistic => Some(CategoryKey::Pending(
                self.next_pending_id.fetch_add(1, Ordering::Relaxed),
            )),
            _ => None,
        };

        self.transition(|state| {
            state.begin();
            if let Some(key) = pending_key {
                state.insert(key, provisional_category(&fields));
            }
        });

        match self.repository.create(fields) {
            Ok(category) => {
                match self.strategy {
                    SyncStrategy::Refetch => self.refetch()?,
                    SyncStrategy::Optimistic => {
                        let merged = category.clone();
                        self.transition(|state| {
                            if let Some(key) = pending_key {
                                state.remove(key);
                            }
                            state.insert(CategoryKey::Persisted(merged.id), merged);
                            state.finish();
                        });
                    }
                    SyncStrategy::AsyncLifecycle => {
                        let merged = category.clone();
                        self.transition(|state| {
                            state.insert(CategoryKey::Persisted(merged.id), merged);
                            state.finish();
                        });
                    }
                }
                Ok(category)
            }
            Err(error) => {
                self.transition(|state| {
                    if let Some(key) = pending_key {
                        state.remove(key);
                    }
                });
                Err(self.reject(error))
            }
        }
    }

    /// Replace a category and merge the result into the cache.
    pub async fn update(
        &self,
        category_id: CategoryId,
        fields: NewCategory,
    ) -> Result<Category, Error> {
        self.transition(CategoryState::begin);

        match self.repository.update(category_id, fields) {
            Ok(updated) => {
                match self.strategy {
                    SyncStrategy::Refetch => self.refetch()?,
                    _ => {
                        let merged = updated.clone();
                        self.transition(|state| {
                            state.apply_updated(merged);
                            state.finish();
                        });
                    }
                }
                Ok(updated)
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    /// Delete a category and drop it from the cache.
    ///
    /// The database cascades the delete to the category's expenses; any
    /// expense store caching them must refresh separately.
    pub async fn remove(&self, category_id: CategoryId) -> Result<(), Error> {
        self.transition(CategoryState::begin);

        match self.repository.delete(category_id) {
            Ok(()) => {
                match self.strategy {
                    SyncStrategy::Refetch => self.refetch()?,
                    _ => self.transition(|state| {
                        state.remove(CategoryKey::Persisted(category_id));
                        state.finish();
                    }),
                }
                Ok(())
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    /// Delete duplicate category rows and re-fetch the surviving list.
    ///
    /// Always re-fetches regardless of strategy, since the cleanup does not
    /// report which rows it removed.
    pub async fn remove_duplicates(&self) -> Result<usize, Error> {
        self.transition(CategoryState::begin);

        match self.repository.remove_duplicates() {
            Ok(removed) => {
                self.refetch()?;
                Ok(removed)
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    fn refetch(&self) -> Result<(), Error> {
        match self.repository.get_all() {
            Ok(categories) => {
                self.transition(|state| {
                    state.set_all(categories);
                    state.finish();
                });
                Ok(())
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    fn transition(&self, apply: impl FnOnce(&mut CategoryState)) {
        self.state.send_modify(apply);
    }

    fn reject(&self, error: Error) -> Error {
        tracing::debug!("category mutation failed: {error}");
        self.transition(|state| state.fail(error.to_string()));
        error
    }
}

/// A cache row synthesized from not-yet-persisted fields.
fn provisional_category(fields: &NewCategory) -> Category {
    Category {
        // Never read while the row is pending; the cache key identifies it.
        id: 0,
        name: fields.name.clone(),
        icon: fields.icon.clone(),
        color: fields.color.clone(),
        monthly_budget: fields.monthly_budget,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[cfg(test)]
mod category_store_tests {
    use std::sync::Arc;

    use crate::{
        Error,
        category::{CategoryName, NewCategory},
        db::Database,
        repository::SQLiteCategoryRepository,
        store::SyncStrategy,
    };

    use super::{CategoryKey, CategoryStore};

    fn test_store(strategy: SyncStrategy) -> CategoryStore {
        let database = Database::open_in_memory().unwrap();
        let repository = Arc::new(SQLiteCategoryRepository::new(database.connection()));
        CategoryStore::new(repository, strategy)
    }

    fn fields(name: &str, budget: f64) -> NewCategory {
        NewCategory::new(CategoryName::new_unchecked(name), budget).unwrap()
    }

    #[tokio::test]
    async fn refresh_loads_seeded_categories_sorted_by_name() {
        let store = test_store(SyncStrategy::AsyncLifecycle);

        store.refresh().await.unwrap();

        let state = store.state();
        assert_eq!(state.categories.len(), 8);
        let names: Vec<&str> = state
            .categories
            .iter()
            .map(|cached| cached.category.name.as_ref())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn add_merges_in_sorted_position() {
        let store = test_store(SyncStrategy::AsyncLifecycle);
        store.refresh().await.unwrap();

        let category = store.add(fields("Aquarium", 30.0)).await.unwrap();

        let state = store.state();
        assert_eq!(state.categories.len(), 9);
        assert_eq!(state.categories[0].key, CategoryKey::Persisted(category.id));
        assert_eq!(state.categories[0].category.name.as_ref(), "Aquarium");
    }

    #[tokio::test]
    async fn duplicate_name_rolls_back_and_records_the_error() {
        let store = test_store(SyncStrategy::Optimistic);
        store.refresh().await.unwrap();

        let result = store.add(fields("Food", 10.0)).await;

        assert_eq!(
            result,
            Err(Error::DuplicateCategoryName("Food".to_string()))
        );
        let state = store.state();
        assert_eq!(state.categories.len(), 8);
        assert!(
            !state
                .categories
                .iter()
                .any(|cached| matches!(cached.key, CategoryKey::Pending(_)))
        );
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn optimistic_add_reconciles_to_a_persisted_row() {
        let store = test_store(SyncStrategy::Optimistic);

        let category = store.add(fields("Garden", 45.0)).await.unwrap();

        let state = store.state();
        assert_eq!(state.categories.len(), 1);
        assert_eq!(state.categories[0].key, CategoryKey::Persisted(category.id));
    }

    #[tokio::test]
    async fn update_replaces_the_cached_row() {
        let store = test_store(SyncStrategy::AsyncLifecycle);
        let category = store.add(fields("Garden", 45.0)).await.unwrap();

        store
            .update(category.id, fields("Garden", 60.0).with_icon("🌻"))
            .await
            .unwrap();

        let state = store.state();
        assert_eq!(state.categories.len(), 1);
        assert_eq!(state.categories[0].category.monthly_budget, 60.0);
        assert_eq!(state.categories[0].category.icon, "🌻");
    }

    #[tokio::test]
    async fn update_of_missing_category_records_the_error() {
        let store = test_store(SyncStrategy::AsyncLifecycle);

        let result = store.update(999, fields("Ghost", 1.0)).await;

        assert_eq!(result, Err(Error::UpdateMissingCategory));
        assert!(store.state().error.is_some());
    }

    #[tokio::test]
    async fn remove_drops_the_cached_row() {
        let store = test_store(SyncStrategy::AsyncLifecycle);
        let category = store.add(fields("Garden", 45.0)).await.unwrap();

        store.remove(category.id).await.unwrap();

        assert!(store.state().categories.is_empty());
    }

    #[tokio::test]
    async fn remove_duplicates_reports_count_and_refetches() {
        let store = test_store(SyncStrategy::AsyncLifecycle);
        store.refresh().await.unwrap();

        // The schema's UNIQUE constraint prevents duplicates, so cleanup on a
        // healthy database removes nothing.
        let removed = store.remove_duplicates().await.unwrap();

        assert_eq!(removed, 0);
        assert_eq!(store.state().categories.len(), 8);
    }
}
