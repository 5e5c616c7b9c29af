mod activate;
mod licenses;
mod plans;
mod validate;

pub use activate::*;
pub use licenses::*;
pub use plans::*;
pub use validate::*;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/plans", post(create_plan).get(list_plans))
        .route("/plans/{plan}", get(get_plan))
        .route("/licenses", post(create_license).get(list_licenses))
        .route("/licenses/{key}", get(get_license))
        .route("/licenses/{value}/activate", post(activate_license))
        .route("/licenses/{value}/validate", post(validate_license))
}
