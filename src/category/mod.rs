//! Categories: spending buckets with budgets and display attributes.

mod db;
mod domain;

pub use db::{
    create_category, delete_category, get_all_categories, get_category, update_category,
};
pub use domain::{
    Category, CategoryId, CategoryName, DEFAULT_COLOR, DEFAULT_ICON, NewCategory,
};
