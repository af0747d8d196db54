//! Full-database export as a single JSON document.
//!
//! Intended for backup and sharing. The export reads the raw tables rather
//! than the joined views, so a future import can restore rows verbatim.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    budget::MonthlyBudget,
    category::{Category, get_all_categories},
    datetime::format_timestamp,
    expense::{EXPENSE_COLUMNS, Expense, map_expense_row},
};

/// Everything in the database, plus the moment it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportData {
    /// All categories, name ascending.
    pub categories: Vec<Category>,
    /// All expenses, newest first.
    pub expenses: Vec<Expense>,
    /// All monthly budgets, ordered by period then category.
    pub monthly_budgets: Vec<MonthlyBudget>,
    /// When the export was taken, RFC 3339 in UTC.
    pub exported_at: String,
}

/// Capture the full database contents.
pub fn export_data(connection: &Connection) -> Result<ExportData, Error> {
    let categories = get_all_categories(connection)?;

    let expenses = connection
        .prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses ORDER BY date DESC, id DESC"
        ))?
        .query_map([], map_expense_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let monthly_budgets = connection
        .prepare(
            "SELECT id, year, month, category_id, planned_amount
             FROM monthly_budgets
             ORDER BY year, month, category_id",
        )?
        .query_map([], map_budget_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ExportData {
        categories,
        expenses,
        monthly_budgets,
        exported_at: format_timestamp(OffsetDateTime::now_utc())?,
    })
}

fn map_budget_row(row: &Row) -> Result<MonthlyBudget, rusqlite::Error> {
    Ok(MonthlyBudget {
        id: row.get(0)?,
        year: row.get(1)?,
        month: row.get(2)?,
        category_id: row.get(3)?,
        planned_amount: row.get(4)?,
    })
}
