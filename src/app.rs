use crate::config::environment::AppConfig;
use crate::infra::InfraClients;
use crate::module::rule_governance::crud::RuleStore;
use crate::module::rule_governance::route::register_routes as rule_governance_routes;
use crate::module::submission::crud::SubmissionStore;
use crate::module::submission::route::register_routes as submission_routes;
use axum::Router;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub rules: Arc<RuleStore>,
    pub submissions: Arc<SubmissionStore>,
    pub infra: Option<InfraClients>,
}

impl AppState {
    pub fn new(config: AppConfig, infra: Option<InfraClients>) -> Self {
        Self {
            config,
            rules: Arc::new(RuleStore::default()),
            submissions: Arc::new(SubmissionStore::default()),
            infra,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(rule_governance_routes(state.clone()))
        .merge(submission_routes(state))
}
