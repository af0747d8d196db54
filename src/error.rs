//! Defines the app level error type and conversions from SQLite errors.

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The database file could not be opened or the schema could not be
    /// applied. This error is fatal: the application cannot run without its
    /// database.
    #[error("could not initialize the database: {0}")]
    StorageInit(String),

    /// A query was executed before the schema was created.
    ///
    /// This indicates a bug in the call order rather than a user error.
    #[error("the database schema has not been initialized")]
    NotInitialized,

    /// A category with the same name already exists.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The category ID used to create or update an expense did not match a
    /// valid category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory,

    /// An empty string was used to create a category name.
    #[error("category name cannot be empty")]
    EmptyCategoryName,

    /// An empty string was used as an expense description.
    #[error("expense description cannot be empty")]
    EmptyDescription,

    /// An expense amount must be greater than zero.
    #[error("{0} is not a valid expense amount, amounts must be greater than zero")]
    NonPositiveAmount(f64),

    /// A monthly budget cannot be negative.
    #[error("{0} is not a valid budget, budgets must be zero or greater")]
    NegativeBudget(f64),

    /// Tried to update a category that does not exist.
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to update an expense that does not exist.
    #[error("tried to update an expense that is not in the database")]
    UpdateMissingExpense,

    /// The requested row could not be found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// There was an error parsing or formatting a date-time string.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not handle date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The device location could not be resolved.
    ///
    /// This error is best-effort only and must never block expense creation.
    #[error("could not resolve the device location: {0}")]
    Location(String),

    /// An error occurred while serializing data as JSON.
    #[error("could not serialize as JSON: {0}")]
    Serialization(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 787 occurs when a FOREIGN KEY constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == 787 =>
            {
                Error::InvalidCategory
            }
            rusqlite::Error::SqliteFailure(_, Some(ref desc))
                if desc.starts_with("no such table") =>
            {
                Error::NotInitialized
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

#[cfg(test)]
mod error_conversion_tests {
    use rusqlite::Connection;

    use super::Error;

    #[test]
    fn missing_table_maps_to_not_initialized() {
        let connection = Connection::open_in_memory().unwrap();

        let result: Result<i64, rusqlite::Error> =
            connection.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0));

        let error: Error = result.unwrap_err().into();
        assert_eq!(error, Error::NotInitialized);
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
