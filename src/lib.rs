//! Spendlog is a local-first expense tracker built on SQLite.
//!
//! This library provides the storage engine (schema, migrations-by-recreate,
//! and seeded default categories), typed repository operations over
//! categories, expenses, and monthly budgets, derived aggregate queries for
//! summaries, and reactive in-memory stores that keep cached query results
//! synchronized with the database as mutations settle.

#![warn(missing_docs)]

pub mod budget;
pub mod category;
mod datetime;
pub mod db;
mod error;
pub mod expense;
pub mod export;
pub mod location;
pub mod repository;
pub mod store;
pub mod summary;

pub use db::Database;
pub use error::Error;
