use crate::app::AppState;
use crate::module::error::AppError;
use crate::module::submission::crud;
use crate::module::submission::schema::{
    GenerateInput, GenerateResponse, ListQuery, RuleAnalyticsResponse, SubmissionLookupResponse,
    SubmissionsResponse, UploadedFile, ViolationsResponse,
};
use crate::service::review_service::AdvisoryReview;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

pub async fn generate(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let input = match read_generate_input(multipart).await {
        Ok(input) => input,
        Err(err) => return (err.status, Json(generate_error(err))),
    };
    match crud::generate(&state, input).await {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (err.status, Json(generate_error(err))),
    }
}

pub async fn get_submission(
    State(state): State<AppState>,
    Path(submission_id): Path<String>,
) -> impl IntoResponse {
    match crud::get_submission(&state, &submission_id) {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(SubmissionLookupResponse {
                found: false,
                submission: None,
                violations: Vec::new(),
                error_code: Some(err.code.to_string()),
                reason: err.message,
            }),
        ),
    }
}

pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    match crud::list_submissions(&state, query.limit, query.offset) {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(SubmissionsResponse {
                submissions: Vec::new(),
                total: 0,
                error_code: Some(err.code.to_string()),
            }),
        ),
    }
}

pub async fn list_violations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    match crud::list_violations(&state, query.limit, query.offset) {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(ViolationsResponse {
                violations: Vec::new(),
                total: 0,
                error_code: Some(err.code.to_string()),
            }),
        ),
    }
}

pub async fn rule_analytics(State(state): State<AppState>) -> impl IntoResponse {
    match crud::rule_analytics(&state) {
        Ok(response) => (StatusCode::OK, Json(response)),
        Err(err) => (
            err.status,
            Json(RuleAnalyticsResponse {
                rule_analytics: Vec::new(),
                error_code: Some(err.code.to_string()),
            }),
        ),
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (healthy, response) = crud::health(&state);
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

async fn read_generate_input(mut multipart: Multipart) -> Result<GenerateInput, AppError> {
    let mut user_id = String::new();
    let mut prompt = String::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request("INVALID_MULTIPART", format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_id") => {
                user_id = field.text().await.map_err(|e| {
                    AppError::bad_request("INVALID_MULTIPART", format!("cannot read user_id: {e}"))
                })?;
            }
            Some("prompt") => {
                prompt = field.text().await.map_err(|e| {
                    AppError::bad_request("INVALID_MULTIPART", format!("cannot read prompt: {e}"))
                })?;
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| AppError::bad_request("INVALID_FILE", "file part requires a filename"))?;
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::bad_request("INVALID_MULTIPART", format!("cannot read file part: {e}"))
                })?;
                file = Some(UploadedFile {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(GenerateInput {
        user_id,
        prompt,
        file,
    })
}

fn generate_error(err: AppError) -> GenerateResponse {
    GenerateResponse {
        submission_id: String::new(),
        is_approved: false,
        compliance_status: "error".to_string(),
        decision_reason: err.message,
        generated_content: String::new(),
        violations: Vec::new(),
        total_violations: 0,
        hard_violations: 0,
        soft_violations: 0,
        soft_annotations: String::new(),
        advisory_review: AdvisoryReview::unavailable("pipeline did not complete"),
        error_code: Some(err.code.to_string()),
    }
}
