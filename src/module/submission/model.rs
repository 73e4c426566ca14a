use crate::service::rule_match_service::RuleSeverity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Approved,
    Rejected,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Pipeline progress marker: received, enhanced, generated, reviewed, decided.
/// A failed submission keeps the last stage it completed, so the failed stage
/// is the one after `stage_reached`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Received,
    Enhanced,
    Generated,
    Reviewed,
    Decided,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub uploaded_file_name: Option<String>,
    pub uploaded_file_type: Option<String>,
    pub generated_content: Option<String>,
    pub status: SubmissionStatus,
    pub compliance_status: Option<String>,
    pub stage_reached: PipelineStage,
    pub failure_reason: Option<String>,
    pub created_at: i64,
    pub completed_at: Option<i64>,
}

/// Violation with the rule text denormalized at detection time, so later rule
/// edits never rewrite the historical record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub id: String,
    pub submission_id: String,
    pub rule_id: String,
    pub rule_text: String,
    pub severity: RuleSeverity,
    pub violated_text: String,
    pub context: String,
    pub detected_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentChunkRecord {
    pub id: String,
    pub submission_id: String,
    pub chunk_text: String,
    pub chunk_position: u32,
    pub token_count: usize,
    pub source_type: String,
    pub created_at: i64,
}
