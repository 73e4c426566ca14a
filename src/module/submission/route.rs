use crate::app::AppState;
use crate::module::submission::controller;
use axum::routing::{get, post};
use axum::Router;

pub fn register_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(controller::generate))
        .route("/api/submissions", get(controller::list_submissions))
        .route(
            "/api/submissions/:submission_id",
            get(controller::get_submission),
        )
        .route("/api/violations", get(controller::list_violations))
        .route("/api/analytics/rules", get(controller::rule_analytics))
        .route("/api/health", get(controller::health))
        .with_state(state)
}
