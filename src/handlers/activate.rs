use axum::extract::State;

use crate::db::AppState;
use crate::error::Result;
use crate::extractors::{Json, Path};
use crate::lifecycle;
use crate::models::{ActivateLicense, LicenseView};

/// POST /licenses/{value}/activate - Bind a license to an identifier
///
/// Unexpired time left on another license for the same identifier and
/// service carries over to this one.
pub async fn activate_license(
    State(state): State<AppState>,
    Path(value): Path<String>,
    Json(input): Json<ActivateLicense>,
) -> Result<Json<LicenseView>> {
    let identifier = input.identifier()?.to_string();
    let mut conn = state.db.get()?;
    let now = lifecycle::now();

    let activation = lifecycle::activate(&mut conn, &value, &identifier, input.extra, now)?;

    Ok(Json(LicenseView::at(activation.license, now)))
}
