//! Per-period planned budgets, stored one row per (year, month, category).

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, category::CategoryId};

/// A planned spend for one category in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBudget {
    /// The budget row's database ID.
    pub id: i64,
    /// Calendar year the budget applies to.
    pub year: i32,
    /// Calendar month the budget applies to, 1 through 12.
    pub month: u8,
    /// The category being budgeted for.
    pub category_id: CategoryId,
    /// The planned spend for the period.
    pub planned_amount: f64,
}

/// A monthly budget joined with its category's display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBudgetEntry {
    /// The budget row.
    pub budget: MonthlyBudget,
    /// The joined category's name, `None` if the category was deleted.
    pub category_name: Option<String>,
    /// The joined category's icon.
    pub category_icon: Option<String>,
    /// The joined category's color.
    pub category_color: Option<String>,
}

/// Create or replace the planned amount for a (year, month, category).
///
/// The unique constraint on (year, month, category_id) makes this an upsert:
/// at most one row exists per key.
///
/// # Errors
///
/// Returns [Error::NegativeBudget] if `planned_amount` is negative and
/// [Error::InvalidCategory] if the category does not exist.
pub fn set_monthly_budget(
    year: i32,
    month: u8,
    category_id: CategoryId,
    planned_amount: f64,
    connection: &Connection,
) -> Result<(), Error> {
    if planned_amount < 0.0 {
        return Err(Error::NegativeBudget(planned_amount));
    }

    connection.execute(
        "INSERT OR REPLACE INTO monthly_budgets (year, month, category_id, planned_amount)
         VALUES (?1, ?2, ?3, ?4)",
        (year, month, category_id, planned_amount),
    )?;

    Ok(())
}

/// Retrieve the planned budgets for a month, ordered by category name.
pub fn get_monthly_budgets(
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<MonthlyBudgetEntry>, Error> {
    connection
        .prepare(
            "SELECT mb.id, mb.year, mb.month, mb.category_id, mb.planned_amount,
                    c.name, c.icon, c.color
             FROM monthly_budgets mb
             LEFT JOIN categories c ON mb.category_id = c.id
             WHERE mb.year = ?1 AND mb.month = ?2
             ORDER BY c.name ASC",
        )?
        .query_map((year, month), map_entry_row)?
        .map(|maybe_entry| maybe_entry.map_err(|error| error.into()))
        .collect()
}

fn map_entry_row(row: &Row) -> Result<MonthlyBudgetEntry, rusqlite::Error> {
    Ok(MonthlyBudgetEntry {
        budget: MonthlyBudget {
            id: row.get(0)?,
            year: row.get(1)?,
            month: row.get(2)?,
            category_id: row.get(3)?,
            planned_amount: row.get(4)?,
        },
        category_name: row.get(5)?,
        category_icon: row.get(6)?,
        category_color: row.get(7)?,
    })
}

#[cfg(test)]
mod monthly_budget_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{CategoryName, NewCategory, create_category},
        db::initialize,
    };

    use super::{get_monthly_budgets, set_monthly_budget};

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    #[test]
    fn set_twice_keeps_one_row_with_latest_amount() {
        let connection = get_test_connection();
        let category = create_category(
            NewCategory::new(CategoryName::new_unchecked("Groceries"), 0.0).unwrap(),
            &connection,
        )
        .unwrap();

        set_monthly_budget(2025, 6, category.id, 100.0, &connection).unwrap();
        set_monthly_budget(2025, 6, category.id, 150.0, &connection).unwrap();

        let budgets = get_monthly_budgets(2025, 6, &connection).unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].budget.planned_amount, 150.0);
        assert_eq!(budgets[0].category_name.as_deref(), Some("Groceries"));
    }

    #[test]
    fn set_rejects_negative_amount() {
        let connection = get_test_connection();

        let result = set_monthly_budget(2025, 6, 1, -5.0, &connection);

        assert_eq!(result, Err(Error::NegativeBudget(-5.0)));
    }

    #[test]
    fn set_rejects_invalid_category() {
        let connection = get_test_connection();

        let result = set_monthly_budget(2025, 6, 999_999, 50.0, &connection);

        assert_eq!(result, Err(Error::InvalidCategory));
    }

    #[test]
    fn budgets_are_scoped_to_their_month() {
        let connection = get_test_connection();
        let category = create_category(
            NewCategory::new(CategoryName::new_unchecked("Groceries"), 0.0).unwrap(),
            &connection,
        )
        .unwrap();

        set_monthly_budget(2025, 6, category.id, 100.0, &connection).unwrap();

        assert!(get_monthly_budgets(2025, 7, &connection).unwrap().is_empty());
    }
}
