//! Helpers for converting between [OffsetDateTime] and the TEXT timestamps
//! stored in SQLite.
//!
//! Expense dates are written as RFC 3339 UTC strings so that SQLite's
//! `strftime` and `date` functions can operate on them directly. Rows written
//! by the schema's `DEFAULT CURRENT_TIMESTAMP` use SQLite's own
//! `YYYY-MM-DD HH:MM:SS` format, so parsing accepts both.

use time::{
    OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339, macros::format_description,
};

use crate::Error;

/// Format a date-time as an RFC 3339 UTC string for storage.
pub(crate) fn format_timestamp(value: OffsetDateTime) -> Result<String, Error> {
    value
        .to_offset(time::UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), value.to_string()))
}

/// Parse a stored timestamp string.
///
/// Accepts RFC 3339 strings and SQLite `CURRENT_TIMESTAMP` output
/// (interpreted as UTC).
pub(crate) fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, Error> {
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(parsed);
    }

    let sqlite_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

    PrimitiveDateTime::parse(raw, &sqlite_format)
        .map(|datetime| datetime.assume_utc())
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), raw.to_string()))
}

/// Parse a stored timestamp inside a `rusqlite` row-mapping closure.
///
/// Wraps the parse error so it can propagate through `rusqlite::Error`.
pub(crate) fn parse_timestamp_column(
    raw: String,
    column_index: usize,
) -> Result<OffsetDateTime, rusqlite::Error> {
    parse_timestamp(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            column_index,
            rusqlite::types::Type::Text,
            format!("{error}").into(),
        )
    })
}
