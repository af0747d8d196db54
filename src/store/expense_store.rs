//! The reactive expense store: an in-memory cache of query results that
//! mediates mutations against the repository.
//!
//! Every mutation runs as a three-phase transition: *pending* (mark loading,
//! clear the prior error), *fulfilled* (merge the authoritative payload and
//! adjust the derived total), *rejected* (record the error and roll back any
//! provisional row). A failed mutation never leaves the cache partially
//! applied.

use std::{
    sync::{Arc, atomic::{AtomicU64, Ordering}},
    time::Duration,
};

use time::OffsetDateTime;
use tokio::sync::watch;

use crate::{
    Error,
    expense::{Expense, ExpenseId, ExpenseWithCategory, NewExpense},
    location::{LocationProvider, resolve_location},
    repository::ExpenseRepository,
    store::{
        SyncStrategy,
        state::{ExpenseKey, ExpenseState, Period},
    },
};

/// A reactive cache of expenses backed by an [ExpenseRepository].
pub struct ExpenseStore {
    repository: Arc<dyn ExpenseRepository>,
    strategy: SyncStrategy,
    period: Period,
    state: watch::Sender<ExpenseState>,
    next_pending_id: AtomicU64,
}

impl ExpenseStore {
    /// Create a store scoped to the given period.
    ///
    /// The repository is injected here; the store never reaches for storage
    /// through any other path.
    pub fn new(
        repository: Arc<dyn ExpenseRepository>,
        strategy: SyncStrategy,
        period: Period,
    ) -> Self {
        let (state, _) = watch::channel(ExpenseState::default());

        Self {
            repository,
            strategy,
            period,
            state,
            next_pending_id: AtomicU64::new(1),
        }
    }

    /// Create a store scoped to the calendar month containing now.
    pub fn for_current_month(repository: Arc<dyn ExpenseRepository>, strategy: SyncStrategy) -> Self {
        Self::new(repository, strategy, Period::current())
    }

    /// Subscribe to state snapshots. The presentation layer re-renders from
    /// these instead of reaching into the store.
    pub fn subscribe(&self) -> watch::Receiver<ExpenseState> {
        self.state.subscribe()
    }

    /// The current state snapshot.
    pub fn state(&self) -> ExpenseState {
        self.state.borrow().clone()
    }

    /// The cached current-period total.
    pub fn total_spent(&self) -> f64 {
        self.state.borrow().total_spent()
    }

    /// Re-fetch both cached collections from the repository.
    pub async fn refresh(&self) -> Result<(), Error> {
        self.transition(ExpenseState::begin);

        match self.fetch_both() {
            Ok((all, month)) => {
                self.transition(|state| {
                    state.set_all(all);
                    state.set_current_month(month);
                    state.finish();
                });
                Ok(())
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    /// Create an expense and merge it into the cache.
    ///
    /// # Errors
    ///
    /// Propagates repository errors. The cache is restored to its
    /// pre-mutation state on failure and the error message is recorded for
    /// the UI.
    pub async fn add(&self, fields: NewExpense) -> Result<Expense, Error> {
        let pending_key = match self.strategy {
            SyncStrategy::Optimistic => Some(ExpenseKey::Pending(
                self.next_pending_id.fetch_add(1, Ordering::Relaxed),
            )),
            _ => None,
        };
        let provisional = provisional_entry(&fields);

        self.transition(|state| {
            state.begin();
            if let Some(key) = pending_key {
                state.insert(key, provisional, self.period);
            }
        });

        match self.repository.create(fields) {
            Ok(expense) => {
                match self.strategy {
                    SyncStrategy::Refetch => self.refetch_after_mutation()?,
                    SyncStrategy::Optimistic => {
                        let entry = bare_entry(expense.clone());
                        self.transition(|state| {
                            // Reconciliation: discard the provisional row in
                            // favour of the storage-assigned one.
                            if let Some(key) = pending_key {
                                state.reconcile_pending(key, entry, self.period);
                            }
                            state.finish();
                        });
                    }
                    SyncStrategy::AsyncLifecycle => {
                        let entry = bare_entry(expense.clone());
                        self.transition(|state| {
                            state.apply_created(entry, self.period);
                            state.finish();
                        });
                    }
                }
                Ok(expense)
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

    /// Create an expense tagged with the device location, if it can be
    /// resolved within `location_deadline`.
    ///
    /// The lookup is best-effort: denial, failure, or timeout leaves the
    /// location fields null and the expense is created regardless.
    pub async fn add_with_location<P: LocationProvider>(
        &self,
        fields: NewExpense,
        provider: &P,
        location_deadline: Duration,
    ) -> Result<Expense, Error> {
        let location = resolve_location(provider, location_deadline).await;

        self.add(fields.with_resolved_location(location)).await
    }

    /// Replace an expense and merge the result into the cache.
    ///
    /// The merge applies in completion order: if the row was deleted while
    /// this update was in flight, the fulfilled update does not resurrect it.
    pub async fn update(&self, expense_id: ExpenseId, fields: NewExpense) -> Result<Expense, Error> {
        self.transition(ExpenseState::begin);

        match self.repository.update(expense_id, fields) {
            Ok(updated) => {
                match self.strategy {
                    SyncStrategy::Refetch => self.refetch_after_mutation()?,
                    _ => {
                        let entry = bare_entry(updated.clone());
                        self.transition(|state| {
                            state.apply_updated(entry, self.period);
                            state.finish();
                        });
                    }
                }
                Ok(updated)
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    /// Delete an expense and drop it from the cache.
    pub async fn remove(&self, expense_id: ExpenseId) -> Result<(), Error> {
        self.transition(ExpenseState::begin);

        match self.repository.delete(expense_id) {
            Ok(()) => {
                match self.strategy {
                    SyncStrategy::Refetch => self.refetch_after_mutation()?,
                    _ => self.transition(|state| {
                        state.apply_deleted(expense_id);
                        state.finish();
                    }),
                }
                Ok(())
            }
            Err(error) => Err(self.reject(error)),
        }
    }

    fn fetch_both(
        &self,
    ) -> Result<(Vec<ExpenseWithCategory>, Vec<ExpenseWithCategory>), Error> {
        let all = self.repository.get_all()?;
        let month = self
            .repository
            .get_for_month(self.period.year, self.period.month)?;

        Ok((all, month))
    }

    fn refetch_after_mutation(&self) -> Result<(), Error> {
        match self.fetch_both() {
            Ok((all, month)) => {
                self.transition(|state| {
                    state.set_all(all);
                    state.set_current_month(month);
                    state.finish();
                });
                Ok(())
            }
            // The mutation itself succeeded; the cache keeps its previous
            // consistent contents and the error is surfaced.
            Err(error) => Err(self.reject(error)),
        }
    }

    fn transition(&self, apply: impl FnOnce(&mut ExpenseState)) {
        self.state.send_modify(apply);
    }

    fn reject(&self, error: Error) -> Error {
        tracing::debug!("expense mutation failed: {error}");
        self.transition(|state| state.fail(error.to_string()));
        error
    }
}

/// A cache row synthesized from not-yet-persisted fields.
///
/// Category display fields stay empty until the next refresh; the payload
/// returned by the repository does not carry them.
fn provisional_entry(fields: &NewExpense) -> ExpenseWithCategory {
    ExpenseWithCategory {
        expense: Expense {
            // Never read while the row is pending; the cache key identifies it.
            id: 0,
            category_id: fields.category_id,
            amount: fields.amount,
            description: fields.description.clone(),
            location_name: fields.location_name.clone(),
            latitude: fields.latitude,
            longitude: fields.longitude,
            date: fields.date,
            created_at: OffsetDateTime::now_utc(),
        },
        category_name: None,
        category_icon: None,
        category_color: None,
    }
}

fn bare_entry(expense: Expense) -> ExpenseWithCategory {
    ExpenseWithCategory {
        expense,
        category_name: None,
        category_icon: None,
        category_color: None,
    }
}
