//! Plan durations: a positive quantity of a calendar unit.
//!
//! Durations are written as `"<quantity> <unit>"` (e.g. `"15 years"`) and
//! parsed once, when a plan is created. Applying a duration to a timestamp
//! uses calendar arithmetic: month-based units clamp to the last valid day of
//! the target month, so `2024-02-29 + 1 year` lands on `2025-02-28`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("duration must look like \"<quantity> <unit>\", got {0:?}")]
    Malformed(String),
    #[error("duration quantity must be a positive integer, got {0:?}")]
    InvalidQuantity(String),
    #[error("unknown duration unit {0:?}")]
    UnknownUnit(String),
    #[error("adding {0} overflows the supported date range")]
    OutOfRange(PlanDuration),
}

/// Calendar unit of a plan duration. Stored in the database by its canonical
/// plural name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Quarters,
    Years,
}

impl DurationUnit {
    /// Resolve a unit as written in a duration string. Accepts the singular,
    /// the plural and the one-letter short form. Short forms are
    /// case-sensitive (`m` is minutes, `M` is months); long forms are not.
    pub fn parse(raw: &str) -> Option<Self> {
        let unit = match raw {
            "s" => Self::Seconds,
            "m" => Self::Minutes,
            "h" => Self::Hours,
            "d" => Self::Days,
            "w" => Self::Weeks,
            "M" => Self::Months,
            "Q" => Self::Quarters,
            "y" => Self::Years,
            _ => match raw.to_ascii_lowercase().as_str() {
                "second" | "seconds" => Self::Seconds,
                "minute" | "minutes" => Self::Minutes,
                "hour" | "hours" => Self::Hours,
                "day" | "days" => Self::Days,
                "week" | "weeks" => Self::Weeks,
                "month" | "months" => Self::Months,
                "quarter" | "quarters" => Self::Quarters,
                "year" | "years" => Self::Years,
                _ => return None,
            },
        };
        Some(unit)
    }
}

/// A validated plan duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlanDuration {
    pub quantity: u32,
    pub unit: DurationUnit,
}

impl PlanDuration {
    pub fn new(quantity: u32, unit: DurationUnit) -> Result<Self, DurationError> {
        if quantity == 0 {
            return Err(DurationError::InvalidQuantity(quantity.to_string()));
        }
        Ok(Self { quantity, unit })
    }

    /// Add this duration to `start`.
    pub fn add_to(&self, start: DateTime<Utc>) -> Result<DateTime<Utc>, DurationError> {
        let q = self.quantity;
        let result = match self.unit {
            DurationUnit::Seconds => start.checked_add_signed(TimeDelta::seconds(q.into())),
            DurationUnit::Minutes => start.checked_add_signed(TimeDelta::minutes(q.into())),
            DurationUnit::Hours => start.checked_add_signed(TimeDelta::hours(q.into())),
            DurationUnit::Days => start.checked_add_days(Days::new(q.into())),
            DurationUnit::Weeks => start.checked_add_days(Days::new(u64::from(q) * 7)),
            DurationUnit::Months => start.checked_add_months(Months::new(q)),
            DurationUnit::Quarters => q
                .checked_mul(3)
                .and_then(|m| start.checked_add_months(Months::new(m))),
            DurationUnit::Years => q
                .checked_mul(12)
                .and_then(|m| start.checked_add_months(Months::new(m))),
        };
        result.ok_or(DurationError::OutOfRange(*self))
    }
}

impl FromStr for PlanDuration {
    type Err = DurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(quantity), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(DurationError::Malformed(s.to_string()));
        };

        if !quantity.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DurationError::InvalidQuantity(quantity.to_string()));
        }
        let quantity: u32 = quantity
            .parse()
            .map_err(|_| DurationError::InvalidQuantity(quantity.to_string()))?;
        let unit =
            DurationUnit::parse(unit).ok_or_else(|| DurationError::UnknownUnit(unit.to_string()))?;

        Self::new(quantity, unit)
    }
}

impl TryFrom<String> for PlanDuration {
    type Error = DurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlanDuration> for String {
    fn from(d: PlanDuration) -> Self {
        d.to_string()
    }
}

impl fmt::Display for PlanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.unit.as_ref())
    }
}
