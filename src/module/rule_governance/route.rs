use crate::app::AppState;
use crate::module::rule_governance::controller;
use axum::routing::{get, post, put};
use axum::Router;

pub fn register_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/super-admin/rules",
            post(controller::create_rule).get(controller::list_rules),
        )
        .route(
            "/api/super-admin/rules/force-create",
            post(controller::force_create_rule),
        )
        .route(
            "/api/super-admin/rules/:rule_id",
            put(controller::update_rule).delete(controller::deactivate_rule),
        )
        .route(
            "/api/super-admin/documents/upload",
            post(controller::upload_document),
        )
        .route("/api/super-admin/documents", get(controller::list_documents))
        .with_state(state)
}
