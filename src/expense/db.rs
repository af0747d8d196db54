//! Database operations for expenses.

use rusqlite::{Connection, Row};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::CategoryId,
    datetime::{format_timestamp, parse_timestamp_column},
    expense::{Expense, ExpenseId, ExpenseWithCategory, NewExpense},
};

pub(crate) const EXPENSE_COLUMNS: &str =
    "id, category_id, amount, description, location_name, latitude, longitude, date, created_at";

const JOINED_COLUMNS: &str = "e.id, e.category_id, e.amount, e.description, e.location_name, \
     e.latitude, e.longitude, e.date, e.created_at, c.name, c.icon, c.color";

/// Create an expense and return it with its generated ID.
///
/// Amount and description validation happens in [NewExpense::new], before
/// this function is called.
///
/// # Errors
///
/// Returns [Error::InvalidCategory] if `category_id` does not reference an
/// existing category.
pub fn create_expense(fields: NewExpense, connection: &Connection) -> Result<Expense, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection.execute(
        "INSERT INTO expenses
            (category_id, amount, description, location_name, latitude, longitude, date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (
            fields.category_id,
            fields.amount,
            &fields.description,
            &fields.location_name,
            fields.latitude,
            fields.longitude,
            format_timestamp(fields.date)?,
            format_timestamp(created_at)?,
        ),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Expense {
        id,
        category_id: fields.category_id,
        amount: fields.amount,
        description: fields.description,
        location_name: fields.location_name,
        latitude: fields.latitude,
        longitude: fields.longitude,
        date: fields.date,
        created_at,
    })
}

/// Retrieve a single expense by ID.
pub fn get_expense(expense_id: ExpenseId, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = :id"
        ))?
        .query_row(&[(":id", &expense_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all expenses with their category display fields, newest first.
pub fn get_all_expenses(connection: &Connection) -> Result<Vec<ExpenseWithCategory>, Error> {
    connection
        .prepare(&format!(
            "SELECT {JOINED_COLUMNS}
             FROM expenses e
             LEFT JOIN categories c ON e.category_id = c.id
             ORDER BY e.date DESC, e.id DESC"
        ))?
        .query_map([], map_joined_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the expenses recorded in the given calendar month, newest first.
///
/// The filter compares the textual year and zero-padded month components of
/// the stored date string, matching how dates are stored as ISO text. Rows
/// whose date does not conform to that format will not match.
pub fn get_expenses_for_month(
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<ExpenseWithCategory>, Error> {
    connection
        .prepare(&format!(
            "SELECT {JOINED_COLUMNS}
             FROM expenses e
             LEFT JOIN categories c ON e.category_id = c.id
             WHERE strftime('%Y', e.date) = ?1 AND strftime('%m', e.date) = ?2
             ORDER BY e.date DESC, e.id DESC"
        ))?
        .query_map([year.to_string(), format!("{month:02}")], map_joined_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a category's expenses between two dates (inclusive), newest first.
pub fn get_expenses_by_category_in_range(
    category_id: CategoryId,
    start: Date,
    end: Date,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses
             WHERE category_id = ?1 AND date(date) BETWEEN date(?2) AND date(?3)
             ORDER BY date DESC, id DESC"
        ))?
        .query_map(
            (category_id, start.to_string(), end.to_string()),
            map_row,
        )?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Replace an expense's fields and return the updated row.
///
/// # Errors
///
/// Returns [Error::UpdateMissingExpense] if the expense doesn't exist, and
/// [Error::InvalidCategory] if the new category reference is invalid.
pub fn update_expense(
    expense_id: ExpenseId,
    fields: NewExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    let rows_affected = connection.execute(
        "UPDATE expenses SET category_id = ?1, amount = ?2, description = ?3,
            location_name = ?4, latitude = ?5, longitude = ?6, date = ?7
         WHERE id = ?8",
        (
            fields.category_id,
            fields.amount,
            &fields.description,
            &fields.location_name,
            fields.latitude,
            fields.longitude,
            format_timestamp(fields.date)?,
            expense_id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingExpense);
    }

    get_expense(expense_id, connection)
}

/// Delete an expense by ID. Deleting an absent ID is a no-op, not an error.
pub fn delete_expense(expense_id: ExpenseId, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM expenses WHERE id = ?1", [expense_id])?;

    Ok(())
}

pub(crate) fn map_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let raw_date: String = row.get(7)?;
    let raw_created_at: String = row.get(8)?;

    Ok(Expense {
        id: row.get(0)?,
        category_id: row.get(1)?,
        amount: row.get(2)?,
        description: row.get(3)?,
        location_name: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        date: parse_timestamp_column(raw_date, 7)?,
        created_at: parse_timestamp_column(raw_created_at, 8)?,
    })
}

fn map_joined_row(row: &Row) -> Result<ExpenseWithCategory, rusqlite::Error> {
    Ok(ExpenseWithCategory {
        expense: map_row(row)?,
        category_name: row.get(9)?,
        category_icon: row.get(10)?,
        category_color: row.get(11)?,
    })
}

#[cfg(test)]
mod expense_query_tests {
    use rusqlite::Connection;
    use time::macros::{date, datetime};

    use crate::{
        Error,
        category::{Category, CategoryName, NewCategory, create_category},
        db::initialize,
        expense::NewExpense,
    };

    use super::{
        create_expense, delete_expense, get_all_expenses, get_expense,
        get_expenses_by_category_in_range, get_expenses_for_month, update_expense,
    };

    fn get_test_connection_and_category() -> (Connection, Category) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let category = create_category(
            NewCategory::new(CategoryName::new_unchecked("Groceries"), 100.0).unwrap(),
            &connection,
        )
        .unwrap();

        (connection, category)
    }

    #[test]
    fn create_expense_succeeds() {
        let (connection, category) = get_test_connection_and_category();

        let expense = create_expense(
            NewExpense::new(category.id, 25.50, "lunch").unwrap(),
            &connection,
        )
        .unwrap();

        assert!(expense.id > 0);
        assert_eq!(expense.amount, 25.50);
        assert_eq!(expense.description, "lunch");
        assert_eq!(expense.category_id, category.id);
    }

    #[test]
    fn create_expense_with_invalid_category_fails() {
        let (connection, category) = get_test_connection_and_category();

        let result = create_expense(
            NewExpense::new(category.id + 999, 25.50, "lunch").unwrap(),
            &connection,
        );

        assert_eq!(result, Err(Error::InvalidCategory));
    }

    #[test]
    fn get_all_expenses_includes_category_display_fields() {
        let (connection, category) = get_test_connection_and_category();
        create_expense(
            NewExpense::new(category.id, 9.0, "apples").unwrap(),
            &connection,
        )
        .unwrap();

        let expenses = get_all_expenses(&connection).unwrap();

        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].category_name.as_deref(), Some("Groceries"));
        assert!(expenses[0].category_icon.is_some());
        assert!(expenses[0].category_color.is_some());
    }

    #[test]
    fn get_all_expenses_orders_newest_first() {
        let (connection, category) = get_test_connection_and_category();
        for (amount, date) in [
            (1.0, datetime!(2025-01-05 12:00:00 UTC)),
            (2.0, datetime!(2025-01-20 12:00:00 UTC)),
            (3.0, datetime!(2025-01-10 12:00:00 UTC)),
        ] {
            create_expense(
                NewExpense::new(category.id, amount, "item")
                    .unwrap()
                    .with_date(date),
                &connection,
            )
            .unwrap();
        }

        let expenses = get_all_expenses(&connection).unwrap();

        let amounts: Vec<f64> = expenses
            .iter()
            .map(|entry| entry.expense.amount)
            .collect();
        assert_eq!(amounts, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn get_expenses_for_month_matches_zero_padded_month() {
        let (connection, category) = get_test_connection_and_category();
        create_expense(
            NewExpense::new(category.id, 10.0, "in March")
                .unwrap()
                .with_date(datetime!(2025-03-15 08:00:00 UTC)),
            &connection,
        )
        .unwrap();
        create_expense(
            NewExpense::new(category.id, 20.0, "in April")
                .unwrap()
                .with_date(datetime!(2025-04-02 08:00:00 UTC)),
            &connection,
        )
        .unwrap();

        let march = get_expenses_for_month(2025, 3, &connection).unwrap();

        assert_eq!(march.len(), 1);
        assert_eq!(march[0].expense.description, "in March");
    }

    #[test]
    fn get_expenses_for_month_returns_empty_for_quiet_month() {
        let (connection, _category) = get_test_connection_and_category();

        let expenses = get_expenses_for_month(2025, 12, &connection).unwrap();

        assert!(expenses.is_empty());
    }

    #[test]
    fn get_expenses_by_category_in_range_is_inclusive() {
        let (connection, category) = get_test_connection_and_category();
        for (description, date) in [
            ("before", datetime!(2025-05-31 23:00:00 UTC)),
            ("first day", datetime!(2025-06-01 00:30:00 UTC)),
            ("last day", datetime!(2025-06-30 23:30:00 UTC)),
            ("after", datetime!(2025-07-01 00:30:00 UTC)),
        ] {
            create_expense(
                NewExpense::new(category.id, 5.0, description)
                    .unwrap()
                    .with_date(date),
                &connection,
            )
            .unwrap();
        }

        let expenses = get_expenses_by_category_in_range(
            category.id,
            date!(2025 - 06 - 01),
            date!(2025 - 06 - 30),
            &connection,
        )
        .unwrap();

        let descriptions: Vec<&str> = expenses
            .iter()
            .map(|expense| expense.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["last day", "first day"]);
    }

    #[test]
    fn update_expense_replaces_whole_row() {
        let (connection, category) = get_test_connection_and_category();
        let expense = create_expense(
            NewExpense::new(category.id, 10.0, "lunch").unwrap(),
            &connection,
        )
        .unwrap();

        let updated = update_expense(
            expense.id,
            NewExpense::new(category.id, 12.50, "long lunch")
                .unwrap()
                .with_date(datetime!(2025-06-02 13:00:00 UTC)),
            &connection,
        )
        .unwrap();

        assert_eq!(updated.id, expense.id);
        assert_eq!(updated.amount, 12.50);
        assert_eq!(updated.description, "long lunch");
        assert_eq!(updated.date, datetime!(2025-06-02 13:00:00 UTC));
    }

    #[test]
    fn update_expense_with_invalid_id_fails() {
        let (connection, category) = get_test_connection_and_category();

        let result = update_expense(
            999_999,
            NewExpense::new(category.id, 1.0, "ghost").unwrap(),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingExpense));
    }

    #[test]
    fn delete_expense_removes_the_row() {
        let (connection, category) = get_test_connection_and_category();
        let expense = create_expense(
            NewExpense::new(category.id, 10.0, "lunch").unwrap(),
            &connection,
        )
        .unwrap();

        delete_expense(expense.id, &connection).unwrap();

        assert_eq!(get_expense(expense.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn delete_expense_with_absent_id_is_a_no_op() {
        let (connection, _category) = get_test_connection_and_category();

        let result = delete_expense(999_999, &connection);

        assert_eq!(result, Ok(()));
    }
}
