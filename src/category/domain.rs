//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::Error;

/// Database identifier for a category.
pub type CategoryId = i64;

/// The icon used when a category does not specify one.
pub const DEFAULT_ICON: &str = "💰";

/// The display color used when a category does not specify one.
pub const DEFAULT_COLOR: &str = "#4A90E2";

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is an
    /// empty string.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because
    /// if the non-empty invariant is violated it will cause incorrect
    /// behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-defined spending bucket with a budget and display attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The category's database ID.
    pub id: CategoryId,
    /// The category's unique, non-empty name.
    pub name: CategoryName,
    /// A display icon token, e.g. an emoji.
    pub icon: String,
    /// A display color, e.g. a hex string.
    pub color: String,
    /// The planned monthly spend for this category. Zero means no budget.
    pub monthly_budget: f64,
    /// When the row was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The fields needed to create a category, or to fully replace an existing
/// one. Updates use whole-row replace semantics, there is no partial patch.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The category's unique, non-empty name.
    pub name: CategoryName,
    /// A display icon token, e.g. an emoji.
    pub icon: String,
    /// A display color, e.g. a hex string.
    pub color: String,
    /// The planned monthly spend, validated non-negative.
    pub monthly_budget: f64,
}

impl NewCategory {
    /// Create the fields for a new category with the default icon and color.
    ///
    /// # Errors
    ///
    /// Returns [Error::NegativeBudget] if `monthly_budget` is less than zero.
    pub fn new(name: CategoryName, monthly_budget: f64) -> Result<Self, Error> {
        if monthly_budget < 0.0 {
            return Err(Error::NegativeBudget(monthly_budget));
        }

        Ok(Self {
            name,
            icon: DEFAULT_ICON.to_string(),
            color: DEFAULT_COLOR.to_string(),
            monthly_budget,
        })
    }

    /// Set the display icon.
    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    /// Set the display color.
    pub fn with_color(mut self, color: &str) -> Self {
        self.color = color.to_string();
        self
    }
}


#[cfg(test)]
mod new_category_tests {
    use crate::Error;

    use super::{CategoryName, DEFAULT_COLOR, DEFAULT_ICON, NewCategory};

    #[test]
    fn new_rejects_negative_budget() {
        let result = NewCategory::new(CategoryName::new_unchecked("Food"), -1.0);

        assert_eq!(result, Err(Error::NegativeBudget(-1.0)));
    }

    #[test]
    fn new_applies_display_defaults() {
        let fields = NewCategory::new(CategoryName::new_unchecked("Food"), 0.0).unwrap();

        assert_eq!(fields.icon, DEFAULT_ICON);
        assert_eq!(fields.color, DEFAULT_COLOR);
    }

    #[test]
    fn builder_overrides_display_fields() {
        let fields = NewCategory::new(CategoryName::new_unchecked("Food"), 100.0)
            .unwrap()
            .with_icon("🍕")
            .with_color("#FF6B6B");

        assert_eq!(fields.icon, "🍕");
        assert_eq!(fields.color, "#FF6B6B");
        assert_eq!(fields.monthly_budget, 100.0);
    }
}
