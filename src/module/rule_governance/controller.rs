use crate::app::AppState;
use crate::module::error::AppError;
use crate::module::rule_governance::crud;
use crate::module::rule_governance::schema::{
    CreateRuleRequest, CreateRuleResponse, DeactivateQuery, DeactivateRuleResponse,
    ListDocumentsResponse, ListRulesQuery, ListRulesResponse, UpdateRuleRequest,
    UpdateRuleResponse, UploadDocumentResponse,
};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn create_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> impl IntoResponse {
    match crud::create_rule(&state, req, false).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (err.status, Json(create_error(err))),
    }
}

pub async fn force_create_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> impl IntoResponse {
    match crud::create_rule(&state, req, true).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (err.status, Json(create_error(err))),
    }
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Json(req): Json<UpdateRuleRequest>,
) -> impl IntoResponse {
    match crud::update_rule(&state, &rule_id, req).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(UpdateRuleResponse {
                status: "error".to_string(),
                message: err.message,
                deactivated_rule_id: None,
                rule: None,
                error_code: Some(err.code.to_string()),
            }),
        ),
    }
}

pub async fn deactivate_rule(
    State(state): State<AppState>,
    Path(rule_id): Path<String>,
    Query(query): Query<DeactivateQuery>,
) -> impl IntoResponse {
    match crud::deactivate_rule(&state, &rule_id, &query.user_id).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(DeactivateRuleResponse {
                status: "error".to_string(),
                message: err.message,
                error_code: Some(err.code.to_string()),
            }),
        ),
    }
}

pub async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<ListRulesQuery>,
) -> impl IntoResponse {
    match crud::list_rules(&state, query.include_inactive) {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(ListRulesResponse {
                rules: Vec::new(),
                total: 0,
                error_code: Some(err.code.to_string()),
            }),
        ),
    }
}

pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(err) => return (err.status, Json(upload_error(err))),
    };
    match crud::upload_reference_document(&state, &upload.file_name, &upload.bytes, &upload.user_id)
        .await
    {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (err.status, Json(upload_error(err))),
    }
}

pub async fn list_documents(State(state): State<AppState>) -> impl IntoResponse {
    match crud::list_reference_documents(&state).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(ListDocumentsResponse {
                documents: Vec::new(),
                total: 0,
                error_code: Some(err.code.to_string()),
            }),
        ),
    }
}

struct DocumentUpload {
    file_name: String,
    bytes: Vec<u8>,
    user_id: String,
}

async fn read_upload(mut multipart: Multipart) -> Result<DocumentUpload, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut user_id = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request("INVALID_MULTIPART", format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::bad_request("INVALID_FILE", "file part requires a filename"))?;
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::bad_request("INVALID_MULTIPART", format!("cannot read file part: {e}"))
                })?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("user_id") => {
                user_id = field.text().await.map_err(|e| {
                    AppError::bad_request("INVALID_MULTIPART", format!("cannot read user_id: {e}"))
                })?;
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| AppError::bad_request("INVALID_FILE", "file part is required"))?;
    Ok(DocumentUpload {
        file_name,
        bytes,
        user_id,
    })
}

fn create_error(err: AppError) -> CreateRuleResponse {
    CreateRuleResponse {
        status: "error".to_string(),
        message: err.message,
        rule: None,
        similar_rules: Vec::new(),
        error_code: Some(err.code.to_string()),
    }
}

fn upload_error(err: AppError) -> UploadDocumentResponse {
    UploadDocumentResponse {
        status: "error".to_string(),
        message: err.message,
        filename: None,
        error_code: Some(err.code.to_string()),
    }
}
