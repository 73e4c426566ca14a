use crate::service::rule_match_service::RuleSeverity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    HumanCreated,
    HumanEdited,
}

/// One immutable version in a rule lineage. Edits never mutate the text of an
/// existing record; they deactivate it and add a successor sharing `root_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: String,
    pub root_id: String,
    pub rule_text: String,
    pub severity: RuleSeverity,
    pub version: u32,
    pub parent_rule_id: Option<String>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: i64,
    pub source: RuleSource,
    pub source_document_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogRecord {
    pub user_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub details: Option<String>,
    pub timestamp: i64,
}
