//! Domain models for the midwifery record store.

mod appointment;
mod health_record;
mod patient;
mod sync_entry;
mod user;

pub use appointment::*;
pub use health_record::*;
pub use patient::*;
pub use sync_entry::*;
pub use user::*;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// A record failed boundary validation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub type ValidationResult = Result<(), ValidationError>;

/// Current time as an RFC 3339 timestamp.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn require_text(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be blank"));
    }
    Ok(())
}

/// Dates are calendar dates in `YYYY-MM-DD` form.
pub(crate) fn check_date(field: &'static str, value: &str) -> ValidationResult {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a YYYY-MM-DD date", value)))
}

pub(crate) fn check_optional_date(field: &'static str, value: Option<&str>) -> ValidationResult {
    match value {
        Some(v) if !v.is_empty() => check_date(field, v),
        _ => Ok(()),
    }
}

/// Times are wall-clock `HH:MM`.
pub(crate) fn check_time(field: &'static str, value: &str) -> ValidationResult {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|_| ())
        .map_err(|_| ValidationError::new(field, format!("'{}' is not an HH:MM time", value)))
}
