use crate::app::AppState;
use crate::infra::{CONTENT_CHUNKS_COLLECTION, SUBMISSIONS_COLLECTION, VIOLATIONS_COLLECTION};
use crate::module::error::AppError;
use crate::module::rule_governance::crud as rule_crud;
use crate::module::rule_governance::crud::now_unix;
use crate::module::rule_governance::model::AuditLogRecord;
use crate::module::submission::model::{
    ContentChunkRecord, PipelineStage, SubmissionRecord, SubmissionStatus, ViolationRecord,
};
use crate::module::submission::schema::{
    GenerateInput, GenerateResponse, HealthResponse, RuleAnalyticsEntry, RuleAnalyticsResponse,
    SubmissionLookupResponse, SubmissionSummary, SubmissionsResponse, ViolationListItem,
    ViolationsResponse,
};
use crate::service::chunking_service::{self, ContentChunk};
use crate::service::review_service::{self, AdvisoryReview};
use crate::service::rule_match_service;
use crate::service::{document_service, generation_service, prompt_service};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

/// In-memory submission store, authoritative like the rule store. MongoDB
/// mirrors terminal records when infra is configured.
#[derive(Debug, Default)]
pub struct SubmissionStore {
    inner: Mutex<SubmissionStoreInner>,
}

#[derive(Debug, Default)]
struct SubmissionStoreInner {
    submissions: Vec<SubmissionRecord>,
    index_by_id: HashMap<String, usize>,
    violations: Vec<ViolationRecord>,
    chunks: Vec<ContentChunkRecord>,
}

fn lock_store(store: &SubmissionStore) -> Result<MutexGuard<'_, SubmissionStoreInner>, AppError> {
    store
        .inner
        .lock()
        .map_err(|_| AppError::internal("STORE_LOCK_ERROR", "submission store lock poisoned"))
}

/// Runs the full pipeline for one submission: receive, enhance, generate,
/// review, decide. Generation and review providers are external; a generation
/// failure fails the submission, a review failure only degrades the advisory
/// section. The rule engine decision at the end is authoritative.
pub async fn generate(state: &AppState, input: GenerateInput) -> Result<GenerateResponse, AppError> {
    let user_id = input.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::bad_request("INVALID_USER_ID", "user_id is required"));
    }
    let prompt = input.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::bad_request(
            "INVALID_PROMPT",
            "prompt is required and must not be blank",
        ));
    }

    let submission_id = Uuid::new_v4().to_string();
    let created_at = now_unix()?;
    let record = SubmissionRecord {
        id: submission_id.clone(),
        user_id: user_id.clone(),
        prompt: prompt.clone(),
        uploaded_file_name: input.file.as_ref().map(|f| f.file_name.clone()),
        uploaded_file_type: None,
        generated_content: None,
        status: SubmissionStatus::Processing,
        compliance_status: None,
        stage_reached: PipelineStage::Received,
        failure_reason: None,
        created_at,
        completed_at: None,
    };
    {
        let mut inner = lock_store(&state.submissions)?;
        let position = inner.submissions.len();
        inner.index_by_id.insert(submission_id.clone(), position);
        inner.submissions.push(record);
    }
    info!(submission_id = %submission_id, "submission received");

    add_chunks(
        state,
        &submission_id,
        chunking_service::chunk_content(
            &prompt,
            "prompt",
            state.config.chunk_min_tokens,
            state.config.chunk_max_tokens,
        ),
    )
    .await?;

    let file_context = match &input.file {
        Some(file) => match document_service::extract_text(&file.file_name, &file.bytes) {
            Ok((text, file_type)) => {
                with_submission(state, &submission_id, |s| {
                    s.uploaded_file_type = Some(file_type);
                })?;
                add_chunks(
                    state,
                    &submission_id,
                    chunking_service::chunk_content(
                        &text,
                        "uploaded_file",
                        state.config.chunk_min_tokens,
                        state.config.chunk_max_tokens,
                    ),
                )
                .await?;
                Some(text)
            }
            Err(reason) => {
                fail_submission(state, &submission_id, PipelineStage::Received, &reason).await;
                return Err(AppError::bad_request("UNSUPPORTED_FILE_TYPE", reason));
            }
        },
        None => None,
    };

    // Fail closed: without the rule set there is no evaluation, so the
    // submission is rejected rather than approved unchecked.
    let rules = match rule_crud::active_rules(&state.rules) {
        Ok(rules) => rules,
        Err(err) => {
            return Ok(reject_unavailable(state, &submission_id, &user_id, &err.message).await);
        }
    };

    let enhanced = prompt_service::enhance(&prompt, &rules, file_context.as_deref());
    advance_stage(state, &submission_id, PipelineStage::Enhanced)?;

    let generated = match generation_service::generate_content(&state.config, &enhanced).await {
        Ok(text) => text,
        Err(reason) => {
            fail_submission(state, &submission_id, PipelineStage::Enhanced, &reason).await;
            return Err(AppError::bad_gateway(
                "GENERATION_FAILED",
                format!("content generation failed: {reason}"),
            ));
        }
    };
    advance_stage(state, &submission_id, PipelineStage::Generated)?;

    let review = match review_service::review_content(&state.config, &generated, &rules).await {
        Ok(review) => review,
        Err(reason) => {
            warn!(submission_id = %submission_id, error = %reason, "advisory review unavailable, continuing");
            AdvisoryReview::unavailable("advisory review unavailable")
        }
    };
    advance_stage(state, &submission_id, PipelineStage::Reviewed)?;

    let outcome = rule_match_service::evaluate(
        &generated,
        &rules,
        state.config.semantic_trigger_threshold,
    );
    let decided_at = now_unix()?;
    let violation_records: Vec<ViolationRecord> = outcome
        .violations
        .iter()
        .map(|v| ViolationRecord {
            id: Uuid::new_v4().to_string(),
            submission_id: submission_id.clone(),
            rule_id: v.rule_id.clone(),
            rule_text: v.rule_text.clone(),
            severity: v.severity,
            violated_text: v.violated_text.clone(),
            context: v.context.clone(),
            detected_at: decided_at,
        })
        .collect();

    add_chunks(
        state,
        &submission_id,
        chunking_service::chunk_content(
            &generated,
            "generated",
            state.config.chunk_min_tokens,
            state.config.chunk_max_tokens,
        ),
    )
    .await?;

    let compliance_status = if outcome.is_approved { "approved" } else { "rejected" };
    let final_record = {
        let mut inner = lock_store(&state.submissions)?;
        let idx = *inner
            .index_by_id
            .get(&submission_id)
            .ok_or_else(|| AppError::internal("STORE_ERROR", "submission vanished mid-pipeline"))?;
        inner.violations.extend(violation_records.iter().cloned());
        let submission = &mut inner.submissions[idx];
        submission.generated_content = Some(generated.clone());
        submission.status = if outcome.is_approved {
            SubmissionStatus::Approved
        } else {
            SubmissionStatus::Rejected
        };
        submission.compliance_status = Some(compliance_status.to_string());
        submission.stage_reached = PipelineStage::Decided;
        submission.completed_at = Some(decided_at);
        submission.clone()
    };

    info!(
        submission_id = %submission_id,
        compliance_status,
        hard_violations = outcome.hard_violations,
        soft_violations = outcome.soft_violations,
        "submission decided"
    );
    persist_submission(state, &final_record).await;
    persist_violations(state, &violation_records).await;
    rule_crud::append_audit(
        state,
        AuditLogRecord {
            user_id,
            action: "generate_content".to_string(),
            entity_type: "submission".to_string(),
            entity_id: submission_id.clone(),
            details: Some(format!("status={compliance_status}")),
            timestamp: decided_at,
        },
    )
    .await;

    Ok(GenerateResponse {
        submission_id,
        is_approved: outcome.is_approved,
        compliance_status: compliance_status.to_string(),
        decision_reason: outcome.decision_reason,
        generated_content: generated,
        violations: violation_records,
        total_violations: outcome.violations.len(),
        hard_violations: outcome.hard_violations,
        soft_violations: outcome.soft_violations,
        soft_annotations: outcome.soft_annotations,
        advisory_review: review,
        error_code: None,
    })
}

pub fn get_submission(state: &AppState, submission_id: &str) -> Result<SubmissionLookupResponse, AppError> {
    let inner = lock_store(&state.submissions)?;
    let Some(idx) = inner.index_by_id.get(submission_id).copied() else {
        return Err(AppError::not_found(
            "SUBMISSION_NOT_FOUND",
            "no submission with that id",
        ));
    };
    let submission = inner.submissions[idx].clone();
    let violations: Vec<ViolationRecord> = inner
        .violations
        .iter()
        .filter(|v| v.submission_id == submission_id)
        .cloned()
        .collect();
    Ok(SubmissionLookupResponse {
        found: true,
        submission: Some(submission),
        violations,
        error_code: None,
        reason: "submission found".to_string(),
    })
}

pub fn list_violations(
    state: &AppState,
    limit: usize,
    offset: usize,
) -> Result<ViolationsResponse, AppError> {
    let inner = lock_store(&state.submissions)?;
    let user_by_submission: HashMap<&str, &str> = inner
        .submissions
        .iter()
        .map(|s| (s.id.as_str(), s.user_id.as_str()))
        .collect();
    let total = inner.violations.len();
    let violations: Vec<ViolationListItem> = inner
        .violations
        .iter()
        .rev()
        .skip(offset)
        .take(limit)
        .map(|v| ViolationListItem {
            id: v.id.clone(),
            submission_id: v.submission_id.clone(),
            user_id: user_by_submission
                .get(v.submission_id.as_str())
                .map(|u| u.to_string()),
            rule_id: v.rule_id.clone(),
            rule_text: v.rule_text.clone(),
            severity: v.severity,
            violated_text: v.violated_text.clone(),
            context: v.context.clone(),
            detected_at: v.detected_at,
        })
        .collect();
    Ok(ViolationsResponse {
        violations,
        total,
        error_code: None,
    })
}

pub fn list_submissions(
    state: &AppState,
    limit: usize,
    offset: usize,
) -> Result<SubmissionsResponse, AppError> {
    let inner = lock_store(&state.submissions)?;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in &inner.violations {
        *counts.entry(v.submission_id.as_str()).or_insert(0) += 1;
    }
    let total = inner.submissions.len();
    let submissions: Vec<SubmissionSummary> = inner
        .submissions
        .iter()
        .rev()
        .skip(offset)
        .take(limit)
        .map(|s| SubmissionSummary {
            id: s.id.clone(),
            user_id: s.user_id.clone(),
            prompt: truncate_prompt(&s.prompt),
            status: s.status.as_str().to_string(),
            compliance_status: s.compliance_status.clone(),
            violation_count: counts.get(s.id.as_str()).copied().unwrap_or(0),
            created_at: s.created_at,
        })
        .collect();
    Ok(SubmissionsResponse {
        submissions,
        total,
        error_code: None,
    })
}

/// Violation counts per rule across every version, zero-count rules included.
pub fn rule_analytics(state: &AppState) -> Result<RuleAnalyticsResponse, AppError> {
    let rules = rule_crud::all_rules(&state.rules)?;
    let counts: HashMap<String, usize> = {
        let inner = lock_store(&state.submissions)?;
        let mut counts = HashMap::new();
        for v in &inner.violations {
            *counts.entry(v.rule_id.clone()).or_insert(0) += 1;
        }
        counts
    };
    let mut rule_analytics: Vec<RuleAnalyticsEntry> = rules
        .into_iter()
        .map(|r| {
            let violation_count = counts.get(&r.id).copied().unwrap_or(0);
            RuleAnalyticsEntry {
                rule_id: r.id,
                rule_text: r.rule_text,
                severity: r.severity,
                is_active: r.is_active,
                violation_count,
            }
        })
        .collect();
    rule_analytics.sort_by(|a, b| b.violation_count.cmp(&a.violation_count));
    Ok(RuleAnalyticsResponse {
        rule_analytics,
        error_code: None,
    })
}

pub fn health(state: &AppState) -> (bool, HealthResponse) {
    let mut checks = BTreeMap::new();
    let generation_ready =
        state.config.generation_api_url.is_some() && state.config.generation_api_key.is_some();
    checks.insert(
        "generation_provider".to_string(),
        if generation_ready { "configured" } else { "missing" }.to_string(),
    );
    checks.insert(
        "review_provider".to_string(),
        if state.config.review_api_url.is_some() {
            "configured"
        } else {
            "missing"
        }
        .to_string(),
    );
    checks.insert(
        "persistence".to_string(),
        if state.infra.is_some() {
            "configured"
        } else {
            "in-memory only"
        }
        .to_string(),
    );

    let healthy = generation_ready;
    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        environment: state.config.rust_env.clone(),
        persistence_enabled: state.infra.is_some(),
        checks,
    };
    (healthy, response)
}

fn truncate_prompt(prompt: &str) -> String {
    let chars: Vec<char> = prompt.chars().collect();
    if chars.len() <= 100 {
        prompt.to_string()
    } else {
        let head: String = chars[..100].iter().collect();
        format!("{head}...")
    }
}

fn with_submission<T>(
    state: &AppState,
    submission_id: &str,
    apply: impl FnOnce(&mut SubmissionRecord) -> T,
) -> Result<T, AppError> {
    let mut inner = lock_store(&state.submissions)?;
    let idx = *inner
        .index_by_id
        .get(submission_id)
        .ok_or_else(|| AppError::internal("STORE_ERROR", "submission vanished mid-pipeline"))?;
    Ok(apply(&mut inner.submissions[idx]))
}

fn advance_stage(
    state: &AppState,
    submission_id: &str,
    stage: PipelineStage,
) -> Result<(), AppError> {
    with_submission(state, submission_id, |s| {
        s.stage_reached = stage;
    })
}

/// Marks a submission failed with the last completed stage and the reason.
/// Best-effort: a broken store lock is logged, not propagated, so the original
/// pipeline error reaches the caller.
async fn fail_submission(state: &AppState, submission_id: &str, stage: PipelineStage, reason: &str) {
    let completed_at = now_unix().ok();
    let record = match with_submission(state, submission_id, |s| {
        s.status = SubmissionStatus::Failed;
        s.stage_reached = stage;
        s.failure_reason = Some(reason.to_string());
        s.completed_at = completed_at;
        s.clone()
    }) {
        Ok(record) => record,
        Err(err) => {
            warn!(submission_id, error = %err.message, "cannot mark submission failed");
            return;
        }
    };
    warn!(submission_id, reason, "submission failed");
    persist_submission(state, &record).await;
}

async fn reject_unavailable(
    state: &AppState,
    submission_id: &str,
    user_id: &str,
    detail: &str,
) -> GenerateResponse {
    let reason = format!("compliance evaluation unavailable, content rejected: {detail}");
    let completed_at = now_unix().ok();
    match with_submission(state, submission_id, |s| {
        s.status = SubmissionStatus::Rejected;
        s.compliance_status = Some("rejected".to_string());
        s.failure_reason = Some(reason.clone());
        s.completed_at = completed_at;
        s.clone()
    }) {
        Ok(record) => persist_submission(state, &record).await,
        Err(err) => {
            warn!(submission_id, error = %err.message, "cannot mark submission rejected")
        }
    }
    warn!(submission_id, user_id, "evaluation unavailable, rejecting submission");
    GenerateResponse {
        submission_id: submission_id.to_string(),
        is_approved: false,
        compliance_status: "rejected".to_string(),
        decision_reason: reason,
        generated_content: String::new(),
        violations: Vec::new(),
        total_violations: 0,
        hard_violations: 0,
        soft_violations: 0,
        soft_annotations: String::new(),
        advisory_review: AdvisoryReview::unavailable("pipeline stopped before review"),
        error_code: Some("EVALUATION_UNAVAILABLE".to_string()),
    }
}

async fn add_chunks(
    state: &AppState,
    submission_id: &str,
    chunks: Vec<ContentChunk>,
) -> Result<(), AppError> {
    if chunks.is_empty() {
        return Ok(());
    }
    let created_at = now_unix()?;
    let records: Vec<ContentChunkRecord> = chunks
        .into_iter()
        .map(|c| ContentChunkRecord {
            id: Uuid::new_v4().to_string(),
            submission_id: submission_id.to_string(),
            chunk_text: c.chunk_text,
            chunk_position: c.chunk_position,
            token_count: c.token_count,
            source_type: c.source_type,
            created_at,
        })
        .collect();
    {
        let mut inner = lock_store(&state.submissions)?;
        inner.chunks.extend(records.iter().cloned());
    }
    if let Some(infra) = &state.infra {
        let collection = infra
            .mongo_db
            .collection::<ContentChunkRecord>(CONTENT_CHUNKS_COLLECTION);
        if let Err(e) = collection.insert_many(&records).await {
            warn!(error = %e, submission_id, "chunk persistence failed");
        }
    }
    Ok(())
}

async fn persist_submission(state: &AppState, record: &SubmissionRecord) {
    let Some(infra) = &state.infra else {
        return;
    };
    let collection = infra
        .mongo_db
        .collection::<SubmissionRecord>(SUBMISSIONS_COLLECTION);
    if let Err(e) = collection.insert_one(record).await {
        warn!(error = %e, submission_id = %record.id, "submission persistence failed");
    }
}

async fn persist_violations(state: &AppState, records: &[ViolationRecord]) {
    let Some(infra) = &state.infra else {
        return;
    };
    if records.is_empty() {
        return;
    }
    let collection = infra
        .mongo_db
        .collection::<ViolationRecord>(VIOLATIONS_COLLECTION);
    if let Err(e) = collection.insert_many(records).await {
        warn!(error = %e, "violation persistence failed");
    }
}
