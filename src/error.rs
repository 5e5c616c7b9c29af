use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::duration::DurationError;

/// Stable error body. Callers branch on `code`, never on `message`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    MissingParameters(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid plan duration: {0}")]
    InvalidDuration(#[from] DurationError),

    #[error("Invalid plan")]
    InvalidPlan,

    #[error("Plan not found")]
    PlanNotFound,

    #[error("Plan alias '{0}' is already taken")]
    AliasTaken(String),

    #[error("License not found")]
    LicenseNotFound,

    #[error("License has no plan to activate against")]
    NoPlanToLicense,

    #[error("License is already active")]
    LicenseAlreadyActive,

    #[error("License is not active")]
    LicenseNotActive,

    #[error("Identifier does not match the license")]
    IdentifierMismatch,

    #[error("License has expired")]
    LicenseExpired,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingParameters(_) => (StatusCode::BAD_REQUEST, "MISSING_PARAMETERS"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::InvalidDuration(_) => (StatusCode::BAD_REQUEST, "INVALID_DURATION"),
            Self::InvalidPlan => (StatusCode::BAD_REQUEST, "INVALID_PLAN"),
            Self::PlanNotFound => (StatusCode::NOT_FOUND, "PLAN_NOT_FOUND"),
            Self::AliasTaken(_) => (StatusCode::CONFLICT, "ALIAS_TAKEN"),
            Self::LicenseNotFound => (StatusCode::NOT_FOUND, "LICENSE_NOT_FOUND"),
            Self::NoPlanToLicense => (StatusCode::UNPROCESSABLE_ENTITY, "NO_PLAN_TO_LICENSE"),
            Self::LicenseAlreadyActive => (StatusCode::CONFLICT, "LICENSE_ALREADY_ACTIVE"),
            Self::LicenseNotActive => (StatusCode::FORBIDDEN, "LICENSE_NOT_ACTIVE"),
            Self::IdentifierMismatch => (StatusCode::FORBIDDEN, "IDENTIFIER_MISMATCH"),
            Self::LicenseExpired => (StatusCode::FORBIDDEN, "LICENSE_EXPIRED"),
            Self::Database(_) | Self::Pool(_) | Self::Serialization(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }

    pub fn code(&self) -> &'static str {
        self.status_and_code().1
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { code, message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
