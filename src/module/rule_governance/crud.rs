use crate::app::AppState;
use crate::infra::{AUDIT_LOG_COLLECTION, RULES_COLLECTION, SCREEN_CACHE_PREFIX, SCREEN_CACHE_TTL_SECONDS};
use crate::module::error::AppError;
use crate::module::rule_governance::model::{AuditLogRecord, RuleRecord, RuleSource};
use crate::module::rule_governance::schema::{
    CreateRuleRequest, CreateRuleResponse, DeactivateRuleResponse, ListDocumentsResponse,
    ListRulesResponse, ReferenceDocument, UpdateRuleRequest, UpdateRuleResponse,
    UploadDocumentResponse,
};
use crate::service::document_service;
use crate::service::embedding_service::{self, SimilarRuleMatch};
use crate::service::rule_match_service::{ActiveRule, RuleSeverity};
use mongodb::bson::doc;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};
use uuid::Uuid;

/// In-memory rule store. Authoritative for reads and writes; MongoDB mirrors
/// records for durability when infra is configured.
#[derive(Debug, Default)]
pub struct RuleStore {
    inner: Mutex<RuleStoreInner>,
}

#[derive(Debug, Default)]
struct RuleStoreInner {
    rules: Vec<RuleRecord>,
    index_by_id: HashMap<String, usize>,
    // active rule id per lineage root
    active_by_root: HashMap<String, String>,
    // (rule_id, rule_text, embedding) for active rules only
    embeddings: Vec<(String, String, Vec<f32>)>,
}

pub fn now_unix() -> Result<i64, AppError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::internal("CLOCK_ERROR", format!("system clock error: {e}")))?;
    Ok(elapsed.as_secs() as i64)
}

fn lock_store(store: &RuleStore) -> Result<MutexGuard<'_, RuleStoreInner>, AppError> {
    store
        .inner
        .lock()
        .map_err(|_| AppError::internal("STORE_LOCK_ERROR", "rule store lock poisoned"))
}

pub async fn create_rule(
    state: &AppState,
    req: CreateRuleRequest,
    force: bool,
) -> Result<CreateRuleResponse, AppError> {
    let text = req.rule_text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::bad_request(
            "INVALID_RULE_TEXT",
            "rule_text is required and must not be blank",
        ));
    }
    let severity = RuleSeverity::parse(&req.severity).ok_or_else(|| {
        AppError::bad_request("INVALID_SEVERITY", "severity must be 'hard' or 'soft'")
    })?;
    let created_by = req.created_by.trim().to_string();
    if created_by.is_empty() {
        return Err(AppError::bad_request("INVALID_CREATED_BY", "created_by is required"));
    }

    let snapshot = {
        let inner = lock_store(&state.rules)?;
        check_exact_duplicate(&inner, &text)?;
        inner.embeddings.clone()
    };

    if !force {
        let similar = screen_similar(state, &text, &snapshot).await;
        if !similar.is_empty() {
            return Ok(CreateRuleResponse {
                status: "warning".to_string(),
                message: "Semantically similar active rules already exist. Review them and \
                          re-submit via force-create to proceed."
                    .to_string(),
                rule: None,
                similar_rules: similar,
                error_code: None,
            });
        }
    }

    let rule_id = Uuid::new_v4().to_string();
    let record = RuleRecord {
        id: rule_id.clone(),
        root_id: rule_id,
        rule_text: text.clone(),
        severity,
        version: 1,
        parent_rule_id: None,
        is_active: true,
        created_by: created_by.clone(),
        created_at: now_unix()?,
        source: RuleSource::HumanCreated,
        source_document_reference: req.source_document_reference,
    };
    let embedding = embedding_service::embed(&text);

    {
        let mut inner = lock_store(&state.rules)?;
        check_exact_duplicate(&inner, &text)?;
        insert_active(&mut inner, record.clone(), embedding);
    }

    info!(rule_id = %record.id, severity = severity.as_str(), force, "rule created");
    persist_rule(state, &record).await;
    append_audit(
        state,
        AuditLogRecord {
            user_id: created_by,
            action: if force { "force_create_rule" } else { "create_rule" }.to_string(),
            entity_type: "rule".to_string(),
            entity_id: record.id.clone(),
            details: Some(format!("severity={}", severity.as_str())),
            timestamp: record.created_at,
        },
    )
    .await;

    Ok(CreateRuleResponse {
        status: "created".to_string(),
        message: "Rule created".to_string(),
        rule: Some(record),
        similar_rules: Vec::new(),
        error_code: None,
    })
}

/// Deactivates the current version and inserts its successor atomically under
/// one lock, so no moment exposes zero or two active versions of a lineage.
pub async fn update_rule(
    state: &AppState,
    rule_id: &str,
    req: UpdateRuleRequest,
) -> Result<UpdateRuleResponse, AppError> {
    let text = req.rule_text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::bad_request(
            "INVALID_RULE_TEXT",
            "rule_text is required and must not be blank",
        ));
    }
    let user_id = req.user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::bad_request("INVALID_USER_ID", "user_id is required"));
    }

    let created_at = now_unix()?;
    let child_id = Uuid::new_v4().to_string();
    let embedding = embedding_service::embed(&text);

    let (parent_id, child) = {
        let mut inner = lock_store(&state.rules)?;
        let idx = *inner
            .index_by_id
            .get(rule_id)
            .ok_or_else(|| AppError::not_found("RULE_NOT_FOUND", "no rule with that id"))?;
        if !inner.rules[idx].is_active {
            return Err(AppError::not_found(
                "RULE_NOT_ACTIVE",
                "rule is inactive; edit the active version of this lineage",
            ));
        }

        let parent = inner.rules[idx].clone();
        let child = RuleRecord {
            id: child_id,
            root_id: parent.root_id.clone(),
            rule_text: text,
            severity: parent.severity,
            version: parent.version + 1,
            parent_rule_id: Some(parent.id.clone()),
            is_active: true,
            created_by: user_id.clone(),
            created_at,
            source: RuleSource::HumanEdited,
            source_document_reference: parent.source_document_reference.clone(),
        };

        inner.rules[idx].is_active = false;
        inner.embeddings.retain(|(id, _, _)| id != &parent.id);
        insert_active(&mut inner, child.clone(), embedding);
        (parent.id, child)
    };

    info!(old_rule_id = %parent_id, new_rule_id = %child.id, version = child.version, "rule updated");
    persist_rule_deactivation(state, &parent_id).await;
    persist_rule(state, &child).await;
    append_audit(
        state,
        AuditLogRecord {
            user_id,
            action: "update_rule".to_string(),
            entity_type: "rule".to_string(),
            entity_id: child.id.clone(),
            details: Some(format!("replaces {parent_id}")),
            timestamp: created_at,
        },
    )
    .await;

    Ok(UpdateRuleResponse {
        status: "updated".to_string(),
        message: "Rule updated; previous version deactivated".to_string(),
        deactivated_rule_id: Some(parent_id),
        rule: Some(child),
        error_code: None,
    })
}

/// Idempotent: deactivating an already-inactive rule succeeds without a new
/// audit entry.
pub async fn deactivate_rule(
    state: &AppState,
    rule_id: &str,
    user_id: &str,
) -> Result<DeactivateRuleResponse, AppError> {
    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::bad_request("INVALID_USER_ID", "user_id is required"));
    }

    let changed = {
        let mut inner = lock_store(&state.rules)?;
        let idx = *inner
            .index_by_id
            .get(rule_id)
            .ok_or_else(|| AppError::not_found("RULE_NOT_FOUND", "no rule with that id"))?;
        if inner.rules[idx].is_active {
            inner.rules[idx].is_active = false;
            let root_id = inner.rules[idx].root_id.clone();
            inner.active_by_root.remove(&root_id);
            inner.embeddings.retain(|(id, _, _)| id != rule_id);
            true
        } else {
            false
        }
    };

    if changed {
        info!(rule_id, "rule deactivated");
        persist_rule_deactivation(state, rule_id).await;
        append_audit(
            state,
            AuditLogRecord {
                user_id,
                action: "deactivate_rule".to_string(),
                entity_type: "rule".to_string(),
                entity_id: rule_id.to_string(),
                details: None,
                timestamp: now_unix()?,
            },
        )
        .await;
    }

    Ok(DeactivateRuleResponse {
        status: "deactivated".to_string(),
        message: "Rule is inactive".to_string(),
        error_code: None,
    })
}

pub fn list_rules(state: &AppState, include_inactive: bool) -> Result<ListRulesResponse, AppError> {
    let mut rules: Vec<RuleRecord> = {
        let inner = lock_store(&state.rules)?;
        inner
            .rules
            .iter()
            .rev()
            .filter(|r| include_inactive || r.is_active)
            .cloned()
            .collect()
    };
    // stable sort keeps newest-insertion-first on created_at ties
    rules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let total = rules.len();
    Ok(ListRulesResponse {
        rules,
        total,
        error_code: None,
    })
}

/// Active rules most-recent-first, as handed to the generation pipeline.
pub fn active_rules(store: &RuleStore) -> Result<Vec<ActiveRule>, AppError> {
    let inner = lock_store(store)?;
    Ok(inner
        .rules
        .iter()
        .rev()
        .filter(|r| r.is_active)
        .map(|r| ActiveRule {
            id: r.id.clone(),
            text: r.rule_text.clone(),
            severity: r.severity,
        })
        .collect())
}

pub fn all_rules(store: &RuleStore) -> Result<Vec<RuleRecord>, AppError> {
    let inner = lock_store(store)?;
    Ok(inner.rules.clone())
}

pub async fn upload_reference_document(
    state: &AppState,
    file_name: &str,
    bytes: &[u8],
    user_id: &str,
) -> Result<UploadDocumentResponse, AppError> {
    let user_id = user_id.trim().to_string();
    if user_id.is_empty() {
        return Err(AppError::bad_request("INVALID_USER_ID", "user_id is required"));
    }
    document_service::validate_filename(file_name)
        .map_err(|e| AppError::bad_request("INVALID_FILENAME", e))?;
    let ext = document_service::file_extension(file_name);
    if !document_service::is_reference_extension(&ext) {
        return Err(AppError::bad_request(
            "UNSUPPORTED_FILE_TYPE",
            format!("'.{ext}' is not an accepted reference document type"),
        ));
    }

    let dir = Path::new(&state.config.reference_docs_dir);
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        AppError::internal("DOCUMENT_WRITE_ERROR", format!("cannot create documents dir: {e}"))
    })?;
    tokio::fs::write(dir.join(file_name), bytes).await.map_err(|e| {
        AppError::internal("DOCUMENT_WRITE_ERROR", format!("cannot store document: {e}"))
    })?;

    info!(file_name, "reference document stored");
    append_audit(
        state,
        AuditLogRecord {
            user_id,
            action: "upload_document".to_string(),
            entity_type: "document".to_string(),
            entity_id: file_name.to_string(),
            details: Some(format!("{} bytes", bytes.len())),
            timestamp: now_unix()?,
        },
    )
    .await;

    Ok(UploadDocumentResponse {
        status: "uploaded".to_string(),
        message: "Reference document stored".to_string(),
        filename: Some(file_name.to_string()),
        error_code: None,
    })
}

pub async fn list_reference_documents(state: &AppState) -> Result<ListDocumentsResponse, AppError> {
    let dir = Path::new(&state.config.reference_docs_dir);
    let mut documents = Vec::new();
    if dir.is_dir() {
        let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
            AppError::internal("DOCUMENT_READ_ERROR", format!("cannot read documents dir: {e}"))
        })?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::internal("DOCUMENT_READ_ERROR", format!("cannot read documents dir: {e}"))
        })? {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let modified_at = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs() as i64);
            documents.push(ReferenceDocument {
                filename: entry.file_name().to_string_lossy().to_string(),
                size_bytes: metadata.len(),
                modified_at,
            });
        }
    }
    documents.sort_by(|a, b| a.filename.cmp(&b.filename));
    let total = documents.len();
    Ok(ListDocumentsResponse {
        documents,
        total,
        error_code: None,
    })
}

fn check_exact_duplicate(inner: &RuleStoreInner, text: &str) -> Result<(), AppError> {
    if inner.embeddings.iter().any(|(_, t, _)| t == text) {
        return Err(AppError::conflict(
            "DUPLICATE_RULE",
            "an active rule with identical text already exists",
        ));
    }
    Ok(())
}

fn insert_active(inner: &mut RuleStoreInner, record: RuleRecord, embedding: Vec<f32>) {
    inner
        .active_by_root
        .insert(record.root_id.clone(), record.id.clone());
    inner
        .embeddings
        .push((record.id.clone(), record.rule_text.clone(), embedding));
    let position = inner.rules.len();
    inner.index_by_id.insert(record.id.clone(), position);
    inner.rules.push(record);
}

/// Similarity screening against the active rule set, cached in Redis for a
/// short TTL keyed by candidate text and active-rule fingerprint. Cache
/// failures degrade to a local computation.
async fn screen_similar(
    state: &AppState,
    text: &str,
    snapshot: &[(String, String, Vec<f32>)],
) -> Vec<SimilarRuleMatch> {
    let compute = || {
        embedding_service::find_similar(
            text,
            snapshot,
            state.config.similarity_threshold,
            state.config.similarity_top_k,
        )
    };
    let Some(infra) = &state.infra else {
        return compute();
    };

    let key = format!("{}{}", SCREEN_CACHE_PREFIX, screening_digest(text, snapshot));
    let mut conn = match infra.redis.get_multiplexed_async_connection().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!(error = %e, "redis unavailable for screening cache");
            return compute();
        }
    };

    match conn.get::<_, Option<String>>(&key).await {
        Ok(Some(raw)) => {
            if let Ok(matches) = serde_json::from_str::<Vec<SimilarRuleMatch>>(&raw) {
                return matches;
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "screening cache read failed"),
    }

    let matches = compute();
    if let Ok(raw) = serde_json::to_string(&matches) {
        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, raw, SCREEN_CACHE_TTL_SECONDS)
            .await
        {
            warn!(error = %e, "screening cache write failed");
        }
    }
    matches
}

fn screening_digest(text: &str, snapshot: &[(String, String, Vec<f32>)]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    for (rule_id, _, _) in snapshot {
        hasher.update(rule_id.as_bytes());
    }
    hex::encode(hasher.finalize())
}

async fn persist_rule(state: &AppState, record: &RuleRecord) {
    let Some(infra) = &state.infra else {
        return;
    };
    let collection = infra.mongo_db.collection::<RuleRecord>(RULES_COLLECTION);
    if let Err(e) = collection.insert_one(record).await {
        warn!(error = %e, rule_id = %record.id, "rule persistence failed");
    }
}

async fn persist_rule_deactivation(state: &AppState, rule_id: &str) {
    let Some(infra) = &state.infra else {
        return;
    };
    let collection = infra.mongo_db.collection::<RuleRecord>(RULES_COLLECTION);
    if let Err(e) = collection
        .update_one(doc! { "id": rule_id }, doc! { "$set": { "is_active": false } })
        .await
    {
        warn!(error = %e, rule_id, "rule deactivation persistence failed");
    }
}

pub(crate) async fn append_audit(state: &AppState, record: AuditLogRecord) {
    let Some(infra) = &state.infra else {
        return;
    };
    let collection = infra
        .mongo_db
        .collection::<AuditLogRecord>(AUDIT_LOG_COLLECTION);
    if let Err(e) = collection.insert_one(&record).await {
        warn!(error = %e, action = %record.action, "audit log persistence failed");
    }
}
