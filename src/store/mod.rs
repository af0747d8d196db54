//! Reactive in-memory stores over the repositories.
//!
//! Each store holds a cached snapshot of query results, publishes it through
//! a watch channel, and keeps it synchronized with the database as mutations
//! settle. The synchronization discipline is selectable per store via
//! [SyncStrategy].

mod category_store;
mod expense_store;
mod state;

pub use category_store::{CachedCategory, CategoryKey, CategoryState, CategoryStore};
pub use expense_store::ExpenseStore;
pub use state::{CachedExpense, ExpenseKey, ExpenseState, Period};

/// How a store reconciles its cache with the database after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncStrategy {
    /// Re-fetch the affected collections after every successful mutation.
    ///
    /// Simplest and always consistent, at the cost of a full read per write.
    Refetch,
    /// Insert a provisional row before the write settles, then reconcile it
    /// with the storage-assigned row (or roll it back on failure).
    Optimistic,
    /// Apply the mutation's returned payload to the cache once the write
    /// settles. No provisional rows, no re-fetch.
    #[default]
    AsyncLifecycle,
}
