use crate::module::submission::model::{SubmissionRecord, ViolationRecord};
use crate::service::review_service::AdvisoryReview;
use crate::service::rule_match_service::RuleSeverity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub struct GenerateInput {
    pub user_id: String,
    pub prompt: String,
    pub file: Option<UploadedFile>,
}

pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub submission_id: String,
    pub is_approved: bool,
    pub compliance_status: String,
    pub decision_reason: String,
    pub generated_content: String,
    pub violations: Vec<ViolationRecord>,
    pub total_violations: usize,
    pub hard_violations: usize,
    pub soft_violations: usize,
    pub soft_annotations: String,
    pub advisory_review: AdvisoryReview,
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionLookupResponse {
    pub found: bool,
    pub submission: Option<SubmissionRecord>,
    pub violations: Vec<ViolationRecord>,
    pub error_code: Option<String>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Serialize)]
pub struct ViolationListItem {
    pub id: String,
    pub submission_id: String,
    pub user_id: Option<String>,
    pub rule_id: String,
    pub rule_text: String,
    pub severity: RuleSeverity,
    pub violated_text: String,
    pub context: String,
    pub detected_at: i64,
}

#[derive(Debug, Serialize)]
pub struct ViolationsResponse {
    pub violations: Vec<ViolationListItem>,
    pub total: usize,
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionSummary {
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub status: String,
    pub compliance_status: Option<String>,
    pub violation_count: usize,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct SubmissionsResponse {
    pub submissions: Vec<SubmissionSummary>,
    pub total: usize,
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RuleAnalyticsEntry {
    pub rule_id: String,
    pub rule_text: String,
    pub severity: RuleSeverity,
    pub is_active: bool,
    pub violation_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RuleAnalyticsResponse {
    pub rule_analytics: Vec<RuleAnalyticsEntry>,
    pub error_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
    pub persistence_enabled: bool,
    pub checks: BTreeMap<String, String>,
}
