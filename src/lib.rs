//! keysmith: issues, activates and validates license keys bound to a service
//! and an optional plan.

pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod keygen;
pub mod lifecycle;
pub mod models;
pub mod pagination;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::db::AppState;

/// The full HTTP application with request tracing.
pub fn app(state: AppState) -> Router {
    handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
