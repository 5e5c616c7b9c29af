use axum::extract::State;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path};
use crate::lifecycle;
use crate::models::{CreatePlan, Plan};

pub async fn create_plan(
    State(state): State<AppState>,
    Json(input): Json<CreatePlan>,
) -> Result<Json<Plan>> {
    let duration = input.validate()?;
    let conn = state.db.get()?;

    let plan = queries::create_plan(&conn, input.alias.as_deref(), duration, lifecycle::now())?;

    tracing::info!(
        plan_id = %plan.id,
        alias = ?plan.alias,
        duration = %plan.duration,
        "Plan created"
    );

    Ok(Json(plan))
}

pub async fn list_plans(State(state): State<AppState>) -> Result<Json<Vec<Plan>>> {
    let conn = state.db.get()?;
    Ok(Json(queries::list_plans(&conn)?))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path(plan): Path<String>,
) -> Result<Json<Plan>> {
    let conn = state.db.get()?;
    let plan = queries::get_plan(&conn, &plan)?.ok_or(AppError::PlanNotFound)?;
    Ok(Json(plan))
}
