mod license;
mod plan;

pub use license::*;
pub use plan::*;

use crate::error::{AppError, Result};

/// Return a required request field, rejecting absent or blank values.
pub(crate) fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::MissingParameters(format!("{} is required", field))),
    }
}
