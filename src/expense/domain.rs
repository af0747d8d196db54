//! Core expense domain types and validation.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, category::CategoryId};

/// Database identifier for an expense.
pub type ExpenseId = i64;

/// A single recorded spending transaction tied to a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The expense's database ID.
    pub id: ExpenseId,
    /// The category this expense belongs to. Always valid at creation time;
    /// deleting the category deletes the expense (cascade).
    pub category_id: CategoryId,
    /// The amount spent, always greater than zero.
    pub amount: f64,
    /// What the money was spent on, never empty.
    pub description: String,
    /// Human-readable place name, if the expense was tagged with a location.
    pub location_name: Option<String>,
    /// Degrees north, if the expense was tagged with a location.
    pub latitude: Option<f64>,
    /// Degrees east, if the expense was tagged with a location.
    pub longitude: Option<f64>,
    /// When the expense happened. Defaults to the creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// When the row was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// An expense joined with its category's display fields for listing.
///
/// The display fields are `None` if the join found no category, which only
/// happens for rows predating the foreign key constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseWithCategory {
    /// The expense row.
    pub expense: Expense,
    /// The joined category's name.
    pub category_name: Option<String>,
    /// The joined category's icon.
    pub category_icon: Option<String>,
    /// The joined category's color.
    pub category_color: Option<String>,
}

/// The fields needed to create an expense, or to fully replace an existing
/// one. Updates use whole-row replace semantics, there is no partial patch.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// The category to record the expense under.
    pub category_id: CategoryId,
    /// The amount spent, validated greater than zero.
    pub amount: f64,
    /// What the money was spent on, validated non-empty.
    pub description: String,
    /// Optional place name for the expense.
    pub location_name: Option<String>,
    /// Optional latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Optional longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// When the expense happened.
    pub date: OffsetDateTime,
}

impl NewExpense {
    /// Create the fields for a new expense dated now.
    ///
    /// Validation happens here, before any storage round trip.
    ///
    /// # Errors
    ///
    /// Returns [Error::NonPositiveAmount] if `amount` is zero or negative, and
    /// [Error::EmptyDescription] if `description` is empty or whitespace.
    pub fn new(category_id: CategoryId, amount: f64, description: &str) -> Result<Self, Error> {
        if amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }

        let description = description.trim();

        if description.is_empty() {
            return Err(Error::EmptyDescription);
        }

        Ok(Self {
            category_id,
            amount,
            description: description.to_string(),
            location_name: None,
            latitude: None,
            longitude: None,
            date: OffsetDateTime::now_utc(),
        })
    }

    /// Set an explicit expense date instead of the creation time.
    pub fn with_date(mut self, date: OffsetDateTime) -> Self {
        self.date = date;
        self
    }

    /// Attach a location to the expense.
    pub fn with_location(mut self, name: &str, latitude: f64, longitude: f64) -> Self {
        self.location_name = Some(name.to_string());
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Attach the result of a best-effort location lookup.
    ///
    /// `None` leaves the location fields null, so a failed or timed-out
    /// lookup never blocks expense creation.
    pub fn with_resolved_location(
        self,
        location: Option<crate::location::ResolvedLocation>,
    ) -> Self {
        match location {
            Some(resolved) => {
                self.with_location(&resolved.name, resolved.latitude, resolved.longitude)
            }
            None => self,
        }
    }
}
