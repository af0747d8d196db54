//! Owns the SQLite connection, the schema DDL, and default-data seeding.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;

use crate::Error;

/// The categories inserted when the database is first created, as
/// `(name, icon, color, monthly_budget)`.
///
/// Seeding uses `INSERT OR IGNORE` guarded by the unique name constraint, so
/// user edits to these rows are never overwritten on subsequent runs.
pub const DEFAULT_CATEGORIES: [(&str, &str, &str, f64); 8] = [
    ("Food", "🍕", "#FF6B6B", 4000.0),
    ("Transport", "🚗", "#4ECDC4", 2000.0),
    ("Entertainment", "🎬", "#45B7D1", 1500.0),
    ("Health", "🏥", "#96CEB4", 1200.0),
    ("Education", "📚", "#FFEAA7", 1800.0),
    ("Utilities", "🏠", "#DDA0DD", 3500.0),
    ("Clothing", "👕", "#98D8C8", 1000.0),
    ("Other", "💼", "#95A5A6", 800.0),
];

/// A handle to the application's SQLite database.
///
/// The single connection is shared behind a mutex; every repository clones
/// the same handle. There is no internal parallelism, concurrent operations
/// serialize on the lock.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (creating if needed) the database file and apply the schema.
    ///
    /// Safe to call on an already-initialized file: the DDL is idempotent and
    /// default categories are only inserted where the name does not already
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [Error::StorageInit] if the file cannot be opened or the DDL
    /// fails. This is fatal, the application cannot proceed without it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let connection = Connection::open(path.as_ref())
            .map_err(|error| Error::StorageInit(error.to_string()))?;

        Self::from_connection(connection)
    }

    /// Open an in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns [Error::StorageInit] if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, Error> {
        let connection = Connection::open_in_memory()
            .map_err(|error| Error::StorageInit(error.to_string()))?;

        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, Error> {
        initialize(&connection).map_err(|error| Error::StorageInit(error.to_string()))?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// The shared connection handle for building repositories.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.connection.clone()
    }
}

/// Apply the schema DDL and seed the default categories.
///
/// Idempotent: tables and indexes are created only if absent, and the seed
/// insert is a no-op for category names that already exist.
///
/// # Errors
///
/// Returns an error if the DDL or the seed insert fails.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Foreign keys are off by default in SQLite and the pragma is a no-op
    // inside a transaction, so set it before the DDL batch.
    connection.pragma_update(None, "foreign_keys", true)?;

    // WAL only applies to on-disk databases; in-memory connections report
    // their own mode, which is fine.
    let _mode: String = connection.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;

    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            icon TEXT DEFAULT '💰',
            color TEXT DEFAULT '#4A90E2',
            monthly_budget REAL DEFAULT 0.0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            location_name TEXT,
            latitude REAL,
            longitude REAL,
            date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (category_id) REFERENCES categories (id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS monthly_budgets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            planned_amount REAL NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (category_id) REFERENCES categories (id) ON DELETE CASCADE,
            UNIQUE(year, month, category_id)
        );

        CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
        CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id);
        CREATE INDEX IF NOT EXISTS idx_monthly_budgets_period ON monthly_budgets(year, month);",
    )?;

    seed_default_categories(connection)?;

    tracing::debug!("database schema initialized");

    Ok(())
}

fn seed_default_categories(connection: &Connection) -> Result<(), rusqlite::Error> {
    for (name, icon, color, monthly_budget) in DEFAULT_CATEGORIES {
        connection.execute(
            "INSERT OR IGNORE INTO categories (name, icon, color, monthly_budget)
             VALUES (?1, ?2, ?3, ?4)",
            (name, icon, color, monthly_budget),
        )?;
    }

    Ok(())
}

/// Delete duplicate category rows, keeping only the lowest-id row per name.
///
/// Corrective operation for data that predates the unique name constraint.
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns an error if the delete statement fails.
pub fn remove_duplicate_categories(connection: &Connection) -> Result<usize, Error> {
    let removed = connection.execute(
        "DELETE FROM categories
         WHERE id NOT IN (
            SELECT MIN(id)
            FROM categories
            GROUP BY name
         )",
        (),
    )?;

    if removed > 0 {
        tracing::info!("removed {removed} duplicate categories");
    }

    Ok(removed)
}

/// Delete all expenses, budgets, and categories, then re-seed the defaults.
///
/// # Errors
///
/// Returns an error if any delete or the re-seed fails.
pub fn clear_all_data(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch(
        "DELETE FROM expenses;
        DELETE FROM monthly_budgets;
        DELETE FROM categories;",
    )?;

    seed_default_categories(connection)?;

    tracing::info!("cleared all data and re-seeded default categories");

    Ok(())
}


#[cfg(test)]
mod duplicate_cleanup_tests {
    use rusqlite::Connection;

    use super::remove_duplicate_categories;

    /// Build a legacy table without the unique name constraint, the situation
    /// the cleanup exists to repair.
    fn legacy_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(
                "CREATE TABLE categories (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL
                );",
            )
            .unwrap();
        connection
    }

    #[test]
    fn keeps_lowest_id_per_name() {
        let connection = legacy_connection();
        for name in ["Food", "Food", "Transport", "Food"] {
            connection
                .execute("INSERT INTO categories (name) VALUES (?1)", (name,))
                .unwrap();
        }

        let removed = remove_duplicate_categories(&connection).unwrap();

        assert_eq!(removed, 2);

        let rows: Vec<(i64, String)> = connection
            .prepare("SELECT id, name FROM categories ORDER BY id")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            rows,
            vec![(1, "Food".to_string()), (3, "Transport".to_string())]
        );
    }

    #[test]
    fn no_op_when_no_duplicates() {
        let connection = legacy_connection();
        connection
            .execute("INSERT INTO categories (name) VALUES ('Food')", ())
            .unwrap();

        let removed = remove_duplicate_categories(&connection).unwrap();

        assert_eq!(removed, 0);
    }
}
