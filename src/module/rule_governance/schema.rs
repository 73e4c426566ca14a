use crate::module::rule_governance::model::RuleRecord;
use crate::service::embedding_service::SimilarRuleMatch;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub rule_text: String,
    pub severity: String,
    pub created_by: String,
    #[serde(default)]
    pub source_document_reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateRuleResponse {
    pub status: String,
    pub message: String,
    pub rule: Option<RuleRecord>,
    pub similar_rules: Vec<SimilarRuleMatch>,
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRuleRequest {
    pub rule_text: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateRuleResponse {
    pub status: String,
    pub message: String,
    pub deactivated_rule_id: Option<String>,
    pub rule: Option<RuleRecord>,
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeactivateQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeactivateRuleResponse {
    pub status: String,
    pub message: String,
    pub error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListRulesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct ListRulesResponse {
    pub rules: Vec<RuleRecord>,
    pub total: usize,
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResponse {
    pub status: String,
    pub message: String,
    pub filename: Option<String>,
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceDocument {
    pub filename: String,
    pub size_bytes: u64,
    pub modified_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListDocumentsResponse {
    pub documents: Vec<ReferenceDocument>,
    pub total: usize,
    pub error_code: Option<String>,
}
