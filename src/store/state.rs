//! The expense cache snapshot and its transition functions.
//!
//! Transitions are plain synchronous methods so they can be exercised
//! directly in tests, independent of any repository or async runtime. The
//! running total is kept in integer cents so that incremental maintenance
//! (add on insert, subtract on delete, replace on update) is arithmetically
//! exact rather than re-derived by chance.

use time::OffsetDateTime;

use crate::expense::{ExpenseId, ExpenseWithCategory};

/// Convert a currency amount to whole cents.
pub(crate) fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert whole cents back to a currency amount.
pub(crate) fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// A calendar year/month used to scope the "current period" cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// Calendar year, e.g. 2025.
    pub year: i32,
    /// Calendar month, 1 through 12.
    pub month: u8,
}

impl Period {
    /// The period containing the current UTC time.
    pub fn current() -> Self {
        let now = OffsetDateTime::now_utc();

        Self {
            year: now.year(),
            month: u8::from(now.month()),
        }
    }

    /// Whether `date` falls inside this period.
    pub fn contains(&self, date: OffsetDateTime) -> bool {
        date.year() == self.year && u8::from(date.month()) == self.month
    }
}

/// Identifies a cached expense row.
///
/// Provisional rows inserted by the optimistic strategy live in their own
/// identifier namespace so they can never collide with (or be mistaken for)
/// storage-assigned IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpenseKey {
    /// A row confirmed by the database, keyed by its real ID.
    Persisted(ExpenseId),
    /// A provisional row awaiting reconciliation, keyed by a local counter.
    Pending(u64),
}

/// One cached expense row with its cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedExpense {
    /// The cache key, persisted or pending.
    pub key: ExpenseKey,
    /// The cached row with its category display fields.
    pub entry: ExpenseWithCategory,
}

/// A snapshot of the expense cache published to subscribers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpenseState {
    /// All cached expenses, newest first.
    pub expenses: Vec<CachedExpense>,
    /// The cached current-period expenses, newest first.
    pub current_month: Vec<CachedExpense>,
    /// Whether a fetch or mutation is in flight.
    pub loading: bool,
    /// The last mutation failure, cleared when a new operation starts.
    pub error: Option<String>,
    total_cents: i64,
}

impl ExpenseState {
    /// The current-period total, maintained incrementally.
    ///
    /// Always equals the exact sum of amounts in [ExpenseState::current_month]
    /// after any settled mutation.
    pub fn total_spent(&self) -> f64 {
        from_cents(self.total_cents)
    }

    /// Mark an operation in flight and clear the previous error.
    pub(crate) fn begin(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Record a failed operation.
    pub(crate) fn fail(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    /// Mark the in-flight operation settled.
    pub(crate) fn finish(&mut self) {
        self.loading = false;
    }

    /// Replace the full expense list with freshly fetched rows.
    pub(crate) fn set_all(&mut self, entries: Vec<ExpenseWithCategory>) {
        self.expenses = entries
            .into_iter()
            .map(|entry| CachedExpense {
                key: ExpenseKey::Persisted(entry.expense.id),
                entry,
            })
            .collect();
    }

    /// Replace the current-period list with freshly fetched rows and derive
    /// the total from them.
    pub(crate) fn set_current_month(&mut self, entries: Vec<ExpenseWithCategory>) {
        self.total_cents = entries
            .iter()
            .map(|entry| to_cents(entry.expense.amount))
            .sum();
        self.current_month = entries
            .into_iter()
            .map(|entry| CachedExpense {
                key: ExpenseKey::Persisted(entry.expense.id),
                entry,
            })
            .collect();
    }

    /// Insert a row under the given key at the front of both lists.
    pub(crate) fn insert(&mut self, key: ExpenseKey, entry: ExpenseWithCategory, period: Period) {
        if period.contains(entry.expense.date) {
            self.total_cents += to_cents(entry.expense.amount);
            self.current_month.insert(
                0,
                CachedExpense {
                    key,
                    entry: entry.clone(),
                },
            );
        }

        self.expenses.insert(0, CachedExpense { key, entry });
    }

    /// Remove the row with the given key from both lists, adjusting the
    /// total. Returns whether a row was removed.
    pub(crate) fn remove(&mut self, key: ExpenseKey) -> bool {
        let in_full_list = self.expenses.iter().any(|cached| cached.key == key);
        self.expenses.retain(|cached| cached.key != key);

        let mut removed_cents = 0;
        let mut in_current_month = false;
        self.current_month.retain(|cached| {
            if cached.key == key {
                removed_cents += to_cents(cached.entry.expense.amount);
                in_current_month = true;
                false
            } else {
                true
            }
        });
        self.total_cents -= removed_cents;

        in_full_list || in_current_month
    }

    /// Merge a confirmed create into the cache.
    pub(crate) fn apply_created(&mut self, entry: ExpenseWithCategory, period: Period) {
        self.insert(ExpenseKey::Persisted(entry.expense.id), entry, period);
    }

    /// Replace a provisional row with the authoritative one.
    pub(crate) fn reconcile_pending(
        &mut self,
        pending: ExpenseKey,
        entry: ExpenseWithCategory,
        period: Period,
    ) {
        self.remove(pending);
        self.apply_created(entry, period);
    }

    /// Merge a confirmed update into the cache.
    ///
    /// Applies only if the row is still cached: an update that settles after
    /// a delete of the same row must not resurrect it. Returns whether the
    /// update was applied.
    pub(crate) fn apply_updated(&mut self, entry: ExpenseWithCategory, period: Period) -> bool {
        let key = ExpenseKey::Persisted(entry.expense.id);

        if !self.expenses.iter().any(|cached| cached.key == key)
            && !self.current_month.iter().any(|cached| cached.key == key)
        {
            return false;
        }

        self.remove(key);
        self.insert(key, entry, period);

        true
    }

    /// Merge a confirmed delete into the cache.
    pub(crate) fn apply_deleted(&mut self, expense_id: ExpenseId) {
        self.remove(ExpenseKey::Persisted(expense_id));
    }
}
