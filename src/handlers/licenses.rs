use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::lifecycle;
use crate::models::{CreateLicenseKey, LicenseFilter, LicenseSort, LicenseStatus, LicenseView};
use crate::pagination::{Paginated, PaginationQuery};

/// Query parameters for GET /licenses. Empty values are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseQuery {
    pub status: Option<String>,
    pub service_id: Option<String>,
    /// Plan id or alias
    pub plan: Option<String>,
    pub identifier: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// POST /licenses - Issue a new license key
pub async fn create_license(
    State(state): State<AppState>,
    Json(input): Json<CreateLicenseKey>,
) -> Result<Json<LicenseView>> {
    let service_id = input.service_id()?;
    let conn = state.db.get()?;
    let now = lifecycle::now();

    let license = lifecycle::issue(
        &conn,
        state.keys.as_ref(),
        state.key_generation_attempts,
        service_id,
        non_empty(&input.plan),
        now,
    )?;

    Ok(Json(LicenseView::at(license, now)))
}

/// GET /licenses - Filtered, paginated listing
pub async fn list_licenses(
    State(state): State<AppState>,
    Query(query): Query<LicenseQuery>,
) -> Result<Json<Paginated<LicenseView>>> {
    let status = non_empty(&query.status)
        .map(|s| {
            s.parse::<LicenseStatus>()
                .map_err(|_| AppError::BadRequest(format!("Unknown status '{}'", s)))
        })
        .transpose()?;
    let sort = non_empty(&query.sort)
        .map(str::parse::<LicenseSort>)
        .transpose()?
        .unwrap_or_default();
    let pagination = PaginationQuery {
        page: query.page,
        limit: query.limit,
    };

    let conn = state.db.get()?;

    // An unknown plan simply matches nothing.
    let plan_id = match non_empty(&query.plan) {
        Some(plan) => Some(
            queries::get_plan(&conn, plan)?
                .map(|p| p.id)
                .unwrap_or_else(|| plan.to_string()),
        ),
        None => None,
    };

    let filter = LicenseFilter {
        status,
        service_id: non_empty(&query.service_id).map(String::from),
        plan_id,
        identifier: non_empty(&query.identifier).map(String::from),
    };

    let now = lifecycle::now();
    let (licenses, total) = queries::list_license_keys(
        &conn,
        &filter,
        sort,
        pagination.limit(),
        pagination.offset(),
        now,
    )?;

    tracing::debug!(?filter, total, "Listed licenses");

    Ok(Json(
        Paginated::new(licenses, total, pagination.page(), pagination.limit())
            .map(|l| LicenseView::at(l, now)),
    ))
}

/// GET /licenses/{key} - Find a license by id or by value
pub async fn get_license(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<LicenseView>> {
    let conn = state.db.get()?;

    let license = if Uuid::parse_str(&key).is_ok() {
        queries::get_license_key_by_id(&conn, &key)?
    } else {
        queries::get_license_key_by_value(&conn, &key)?
    }
    .ok_or(AppError::LicenseNotFound)?;

    Ok(Json(LicenseView::at(license, lifecycle::now())))
}
