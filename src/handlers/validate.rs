use axum::extract::State;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::lifecycle;
use crate::models::{LicenseView, ValidateLicense};

/// POST /licenses/{value}/validate - Check a license for an identifier
///
/// Fails with LICENSE_NOT_FOUND, LICENSE_NOT_ACTIVE, IDENTIFIER_MISMATCH or
/// LICENSE_EXPIRED, checked in that order.
pub async fn validate_license(
    State(state): State<AppState>,
    Path(value): Path<String>,
    Json(input): Json<ValidateLicense>,
) -> Result<Json<LicenseView>> {
    let identifier = input.identifier()?;
    let conn = state.db.get()?;
    let now = lifecycle::now();

    let license = lifecycle::validate(&conn, &value, identifier, now)?;

    Ok(Json(LicenseView::at(license, now)))
}
