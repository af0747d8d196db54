//! Database operations for categories.

use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, NewCategory},
    datetime::{format_timestamp, parse_timestamp_column},
};

/// Create a category and return it with its generated ID.
///
/// # Errors
///
/// Returns [Error::DuplicateCategoryName] if a category with the same name
/// already exists.
pub fn create_category(fields: NewCategory, connection: &Connection) -> Result<Category, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO categories (name, icon, color, monthly_budget, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                fields.name.as_ref(),
                &fields.icon,
                &fields.color,
                fields.monthly_budget,
                format_timestamp(created_at)?,
            ),
        )
        .map_err(|error| map_unique_name_violation(error, &fields.name))?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        name: fields.name,
        icon: fields.icon,
        color: fields.color,
        monthly_budget: fields.monthly_budget,
        created_at,
    })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, icon, color, monthly_budget, created_at
             FROM categories WHERE id = :id",
        )?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered alphabetically by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, icon, color, monthly_budget, created_at
             FROM categories ORDER BY name ASC",
        )?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Replace a category's fields and return the updated row.
///
/// # Errors
///
/// Returns [Error::UpdateMissingCategory] if the category doesn't exist, and
/// [Error::DuplicateCategoryName] if the new name collides with another
/// category.
pub fn update_category(
    category_id: CategoryId,
    fields: NewCategory,
    connection: &Connection,
) -> Result<Category, Error> {
    let rows_affected = connection
        .execute(
            "UPDATE categories SET name = ?1, icon = ?2, color = ?3, monthly_budget = ?4
             WHERE id = ?5",
            (
                fields.name.as_ref(),
                &fields.icon,
                &fields.color,
                fields.monthly_budget,
                category_id,
            ),
        )
        .map_err(|error| map_unique_name_violation(error, &fields.name))?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    get_category(category_id, connection)
}

/// Delete a category by ID, cascading to its expenses.
///
/// Deleting an absent ID is a no-op, not an error. Callers are expected to
/// confirm with the user before invoking this: the cascade is acceptable data
/// loss by design.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    connection.execute("DELETE FROM categories WHERE id = ?1", [category_id])?;

    Ok(())
}

fn map_unique_name_violation(error: rusqlite::Error, name: &CategoryName) -> Error {
    match error {
        // Code 2067 occurs when a UNIQUE constraint failed.
        rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
            if sql_error.extended_code == 2067 && desc.contains("categories.name") =>
        {
            Error::DuplicateCategoryName(name.to_string())
        }
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_name: String = row.get(1)?;
    let raw_created_at: String = row.get(5)?;

    Ok(Category {
        id: row.get(0)?,
        name: CategoryName::new_unchecked(&raw_name),
        icon: row.get(2)?,
        color: row.get(3)?,
        monthly_budget: row.get(4)?,
        created_at: parse_timestamp_column(raw_created_at, 5)?,
    })
}
