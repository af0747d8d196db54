//! Repository traits over the database operations, and their SQLite
//! implementations.
//!
//! The state stores depend on these traits rather than on the connection
//! directly, so tests can substitute failing or scripted repositories.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use time::Date;

use crate::{
    Error,
    category::{
        Category, CategoryId, NewCategory, create_category, delete_category, get_all_categories,
        update_category,
    },
    db,
    expense::{
        Expense, ExpenseId, ExpenseWithCategory, NewExpense, create_expense, delete_expense,
        get_all_expenses, get_expenses_by_category_in_range, get_expenses_for_month,
        update_expense,
    },
};

/// Creates, retrieves, and mutates categories.
pub trait CategoryRepository: Send + Sync {
    /// Create a new category and return it with its generated ID.
    fn create(&self, fields: NewCategory) -> Result<Category, Error>;

    /// Get all categories, sorted by name ascending.
    fn get_all(&self) -> Result<Vec<Category>, Error>;

    /// Replace a category's fields.
    fn update(&self, category_id: CategoryId, fields: NewCategory) -> Result<Category, Error>;

    /// Delete a category, cascading to its expenses. Absent IDs are a no-op.
    fn delete(&self, category_id: CategoryId) -> Result<(), Error>;

    /// Delete duplicate category rows, keeping the lowest ID per name.
    fn remove_duplicates(&self) -> Result<usize, Error>;
}

/// Creates, retrieves, and mutates expenses.
pub trait ExpenseRepository: Send + Sync {
    /// Create a new expense and return it with its generated ID.
    fn create(&self, fields: NewExpense) -> Result<Expense, Error>;

    /// Get all expenses with category display fields, newest first.
    fn get_all(&self) -> Result<Vec<ExpenseWithCategory>, Error>;

    /// Get the expenses for one calendar month, newest first.
    fn get_for_month(&self, year: i32, month: u8) -> Result<Vec<ExpenseWithCategory>, Error>;

    /// Get a category's expenses between two dates (inclusive).
    fn get_by_category_in_range(
        &self,
        category_id: CategoryId,
        start: Date,
        end: Date,
    ) -> Result<Vec<Expense>, Error>;

    /// Replace an expense's fields.
    fn update(&self, expense_id: ExpenseId, fields: NewExpense) -> Result<Expense, Error>;

    /// Delete an expense. Absent IDs are a no-op.
    fn delete(&self, expense_id: ExpenseId) -> Result<(), Error>;
}

/// Creates and retrieves categories to/from a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteCategoryRepository {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteCategoryRepository {
    /// Create a new category repository with a shared SQLite connection.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLock)
    }
}

impl CategoryRepository for SQLiteCategoryRepository {
    fn create(&self, fields: NewCategory) -> Result<Category, Error> {
        create_category(fields, &*self.lock()?)
    }

    fn get_all(&self) -> Result<Vec<Category>, Error> {
        get_all_categories(&*self.lock()?)
    }

    fn update(&self, category_id: CategoryId, fields: NewCategory) -> Result<Category, Error> {
        update_category(category_id, fields, &*self.lock()?)
    }

    fn delete(&self, category_id: CategoryId) -> Result<(), Error> {
        delete_category(category_id, &*self.lock()?)
    }

    fn remove_duplicates(&self) -> Result<usize, Error> {
        db::remove_duplicate_categories(&*self.lock()?)
    }
}

/// Creates and retrieves expenses to/from a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteExpenseRepository {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteExpenseRepository {
    /// Create a new expense repository with a shared SQLite connection.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLock)
    }
}

impl ExpenseRepository for SQLiteExpenseRepository {
    fn create(&self, fields: NewExpense) -> Result<Expense, Error> {
        create_expense(fields, &*self.lock()?)
    }

    fn get_all(&self) -> Result<Vec<ExpenseWithCategory>, Error> {
        get_all_expenses(&*self.lock()?)
    }

    fn get_for_month(&self, year: i32, month: u8) -> Result<Vec<ExpenseWithCategory>, Error> {
        get_expenses_for_month(year, month, &*self.lock()?)
    }

    fn get_by_category_in_range(
        &self,
        category_id: CategoryId,
        start: Date,
        end: Date,
    ) -> Result<Vec<Expense>, Error> {
        get_expenses_by_category_in_range(category_id, start, end, &*self.lock()?)
    }

    fn update(&self, expense_id: ExpenseId, fields: NewExpense) -> Result<Expense, Error> {
        update_expense(expense_id, fields, &*self.lock()?)
    }

    fn delete(&self, expense_id: ExpenseId) -> Result<(), Error> {
        delete_expense(expense_id, &*self.lock()?)
    }
}
