use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use super::{Plan, required};
use crate::error::{AppError, Result};

/// Caller-supplied metadata attached at activation. Never interpreted.
pub type Extra = BTreeMap<String, ExtraValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Integer(i64),
    /// Integers above `i64::MAX`
    Unsigned(u64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseKey {
    pub id: String,
    pub value: String,
    pub service_id: String,
    pub plan: Option<Plan>,
    /// What the license is bound to (device, user, ...). Set on activation.
    pub identifier: Option<String>,
    pub activated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub extra: Extra,
    pub created_at: DateTime<Utc>,
}

/// Derived lifecycle reading of a license at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LicenseStatus {
    Issued,
    Active,
    Expired,
}

impl LicenseKey {
    /// True only when neither half of the activation binding is present.
    /// A record with an identifier but no activation time is not issued.
    pub fn is_issued(&self) -> bool {
        self.identifier.is_none() && self.activated_at.is_none()
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> LicenseStatus {
        if self.activated_at.is_none() {
            return LicenseStatus::Issued;
        }
        match self.expires_at {
            Some(exp) if exp < now => LicenseStatus::Expired,
            _ => LicenseStatus::Active,
        }
    }
}

/// A license together with its status at response time.
#[derive(Debug, Clone, Serialize)]
pub struct LicenseView {
    #[serde(flatten)]
    pub license: LicenseKey,
    pub status: LicenseStatus,
}

impl LicenseView {
    pub fn at(license: LicenseKey, now: DateTime<Utc>) -> Self {
        let status = license.status_at(now);
        Self { license, status }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicenseKey {
    #[serde(default)]
    pub service_id: Option<String>,
    /// Plan id or alias
    #[serde(default)]
    pub plan: Option<String>,
}

impl CreateLicenseKey {
    pub fn service_id(&self) -> Result<&str> {
        required(&self.service_id, "serviceId")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateLicense {
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub extra: Option<Extra>,
}

impl ActivateLicense {
    pub fn identifier(&self) -> Result<&str> {
        required(&self.identifier, "identifier")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateLicense {
    #[serde(default)]
    pub identifier: Option<String>,
}

impl ValidateLicense {
    pub fn identifier(&self) -> Result<&str> {
        required(&self.identifier, "identifier")
    }
}

/// Criteria for listing licenses. Every field is optional; unset fields
/// don't constrain the result.
#[derive(Debug, Default, Clone)]
pub struct LicenseFilter {
    pub status: Option<LicenseStatus>,
    pub service_id: Option<String>,
    pub plan_id: Option<String>,
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseSortField {
    CreatedAt,
    ActivatedAt,
    ExpiresAt,
}

impl LicenseSortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::ActivatedAt => "activated_at",
            Self::ExpiresAt => "expires_at",
        }
    }
}

/// Listing order, written as a field name with an optional `-` prefix for
/// descending order (e.g. `-createdAt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicenseSort {
    pub field: LicenseSortField,
    pub descending: bool,
}

impl Default for LicenseSort {
    fn default() -> Self {
        Self {
            field: LicenseSortField::CreatedAt,
            descending: true,
        }
    }
}

impl FromStr for LicenseSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let (descending, name) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let field = match name {
            "createdAt" | "created_at" => LicenseSortField::CreatedAt,
            "activatedAt" | "activated_at" => LicenseSortField::ActivatedAt,
            "expiresAt" | "expires_at" => LicenseSortField::ExpiresAt,
            _ => return Err(AppError::BadRequest(format!("Cannot sort by '{}'", s))),
        };
        Ok(Self { field, descending })
    }
}
