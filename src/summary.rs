//! Derived aggregate queries: monthly summaries, totals, and daily series.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::{Date, macros::format_description};

use crate::{Error, category::CategoryId};

/// One category's spending in a month, alongside its static budget and
/// display attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    /// The category's database ID.
    pub category_id: CategoryId,
    /// The category name.
    pub name: String,
    /// The category's display icon.
    pub icon: String,
    /// The category's display color.
    pub color: String,
    /// The category's static planned monthly spend.
    pub monthly_budget: f64,
    /// Sum of matching expense amounts, zero if the category has none.
    pub spent: f64,
    /// How many expenses matched.
    pub transaction_count: i64,
}

/// The total spent on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotal {
    /// The calendar day.
    pub day: Date,
    /// Sum of that day's expense amounts.
    pub total: f64,
}

/// Per-category spending for a month, one row per category.
///
/// Categories without expenses are still returned with `spent` of zero
/// (left-join semantics), so callers always see the full category list.
pub fn monthly_summary(
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<CategorySpending>, Error> {
    connection
        .prepare(
            "SELECT c.id, c.name, c.icon, c.color, c.monthly_budget,
                    COALESCE(SUM(e.amount), 0) AS spent,
                    COUNT(e.id) AS transaction_count
             FROM categories c
             LEFT JOIN expenses e ON c.id = e.category_id
                AND strftime('%Y', e.date) = ?1
                AND strftime('%m', e.date) = ?2
             GROUP BY c.id, c.name, c.icon, c.color, c.monthly_budget
             ORDER BY c.name ASC",
        )?
        .query_map([year.to_string(), format!("{month:02}")], map_spending_row)?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

/// Total spent across all expenses in a month, zero if there are none.
pub fn total_spent(year: i32, month: u8, connection: &Connection) -> Result<f64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(amount), 0)
             FROM expenses
             WHERE strftime('%Y', date) = ?1 AND strftime('%m', date) = ?2",
            [year.to_string(), format!("{month:02}")],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Per-day totals for a month, day ascending.
///
/// Only days with at least one expense appear; callers needing a dense
/// series must backfill the missing days with zero themselves.
pub fn daily_spending(
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<DailyTotal>, Error> {
    connection
        .prepare(
            "SELECT date(date) AS day, SUM(amount) AS total
             FROM expenses
             WHERE strftime('%Y', date) = ?1 AND strftime('%m', date) = ?2
             GROUP BY date(date)
             ORDER BY date(date) ASC",
        )?
        .query_map([year.to_string(), format!("{month:02}")], map_daily_row)?
        .map(|maybe_row| maybe_row.map_err(|error| error.into()))
        .collect()
}

/// Round an amount to two decimal places for display.
///
/// Intermediate sums are never truncated; rounding happens only here, at
/// presentation time.
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn map_spending_row(row: &Row) -> Result<CategorySpending, rusqlite::Error> {
    Ok(CategorySpending {
        category_id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        color: row.get(3)?,
        monthly_budget: row.get(4)?,
        spent: row.get(5)?,
        transaction_count: row.get(6)?,
    })
}

fn map_daily_row(row: &Row) -> Result<DailyTotal, rusqlite::Error> {
    let raw_day: String = row.get(0)?;
    let day_format = format_description!("[year]-[month]-[day]");
    let day = Date::parse(&raw_day, &day_format).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("{error}").into(),
        )
    })?;

    Ok(DailyTotal {
        day,
        total: row.get(1)?,
    })
}
