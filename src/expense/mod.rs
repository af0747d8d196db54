//! Expenses: recorded spending transactions with optional locations.

mod db;
mod domain;

pub use db::{
    create_expense, delete_expense, get_all_expenses, get_expense,
    get_expenses_by_category_in_range, get_expenses_for_month, update_expense,
};
pub(crate) use db::{EXPENSE_COLUMNS, map_row as map_expense_row};
pub use domain::{Expense, ExpenseId, ExpenseWithCategory, NewExpense};
