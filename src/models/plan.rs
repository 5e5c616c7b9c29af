use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::duration::PlanDuration;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub alias: Option<String>,
    pub duration: PlanDuration,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlan {
    #[serde(default)]
    pub alias: Option<String>,
    pub duration: String,
}

impl CreatePlan {
    /// Check the alias and parse the duration. Plans with a malformed
    /// duration are never stored.
    pub fn validate(&self) -> Result<PlanDuration> {
        if let Some(alias) = &self.alias {
            if alias.trim().is_empty() {
                return Err(AppError::BadRequest("Plan alias must not be empty".into()));
            }
            // Plans resolve by id or alias, so an alias must never look like an id.
            if Uuid::parse_str(alias).is_ok() {
                return Err(AppError::BadRequest("Plan alias must not be a UUID".into()));
            }
        }
        Ok(self.duration.parse()?)
    }
}
