mod common;

use axum::http::StatusCode;
use common::*;

#[tokio::test]
async fn hard_violation_blocks_generated_content() {
    let app = app_with_generator(
        "Invest with us for guaranteed returns on every deposit.\n\nOur advisors are standing by.",
    )
    .await;

    let (status, _) = post_json(
        &app,
        "/api/super-admin/rules",
        rule_body("Marketing copy must not say guaranteed returns", "hard"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_multipart(
        &app,
        "/api/generate",
        &[("user_id", "user-1"), ("prompt", "Write marketing copy for our savings fund")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_approved"], false);
    assert_eq!(body["compliance_status"], "rejected");
    assert_eq!(body["hard_violations"], 1);
    assert_eq!(body["soft_violations"], 0);
    assert_eq!(body["total_violations"], 1);
    assert!(body["decision_reason"]
        .as_str()
        .expect("decision_reason")
        .contains("BLOCKED"));
    assert!(body["generated_content"]
        .as_str()
        .expect("generated_content")
        .contains("guaranteed returns"));
    let violation = &body["violations"][0];
    assert_eq!(violation["severity"], "hard");
    assert!(violation["context"]
        .as_str()
        .expect("context")
        .contains("guaranteed returns"));

    // the decision is durable on the submission record
    let submission_id = body["submission_id"].as_str().expect("submission_id");
    let (status, lookup) = get_json(&app, &format!("/api/submissions/{submission_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lookup["submission"]["status"], "rejected");
    assert_eq!(lookup["submission"]["stage_reached"], "decided");
    assert_eq!(lookup["violations"].as_array().expect("violations").len(), 1);

    let (_, violations) = get_json(&app, "/api/violations").await;
    assert_eq!(violations["total"], 1);
    assert_eq!(violations["violations"][0]["user_id"], "user-1");

    let (_, analytics) = get_json(&app, "/api/analytics/rules").await;
    assert_eq!(analytics["rule_analytics"][0]["violation_count"], 1);
}

#[tokio::test]
async fn soft_violations_annotate_but_approve() {
    let app = app_with_generator("Our fund also holds crypto assets for diversification.").await;

    post_json(
        &app,
        "/api/super-admin/rules",
        rule_body("Content must not mention crypto", "soft"),
    )
    .await;

    let (status, body) = post_multipart(
        &app,
        "/api/generate",
        &[("user_id", "user-2"), ("prompt", "Describe our fund holdings")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_approved"], true);
    assert_eq!(body["compliance_status"], "approved");
    assert_eq!(body["hard_violations"], 0);
    assert_eq!(body["soft_violations"], 1);
    assert!(body["soft_annotations"]
        .as_str()
        .expect("soft_annotations")
        .contains("SOFT RULE VIOLATIONS"));
}

#[tokio::test]
async fn no_rules_approves_clean_content() {
    let app = app_with_generator("A short, friendly product announcement.").await;

    let (status, body) = post_multipart(
        &app,
        "/api/generate",
        &[("user_id", "user-3"), ("prompt", "Announce our new product")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_approved"], true);
    assert_eq!(body["total_violations"], 0);
    assert_eq!(body["decision_reason"], "No HARD rule violations");
    assert_eq!(body["advisory_review"]["available"], false);
}

#[tokio::test]
async fn generation_failure_fails_the_submission() {
    // nothing listens on this port
    let app = build_app(test_config());

    let (status, body) = post_multipart(
        &app,
        "/api/generate",
        &[("user_id", "user-4"), ("prompt", "Write something")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error_code"], "GENERATION_FAILED");

    let (_, listed) = get_json(&app, "/api/submissions").await;
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["submissions"][0]["status"], "failed");

    // enhancement completed; generation is the stage that failed
    let submission_id = listed["submissions"][0]["id"].as_str().expect("submission id");
    let (_, lookup) = get_json(&app, &format!("/api/submissions/{submission_id}")).await;
    assert_eq!(lookup["submission"]["stage_reached"], "enhanced");
    assert!(!lookup["submission"]["failure_reason"].is_null());
}

#[tokio::test]
async fn submissions_list_paginates_newest_first() {
    let app = build_app(test_config());

    for i in 0..3 {
        let prompt = format!("Prompt number {i}");
        let (status, _) = post_multipart(
            &app,
            "/api/generate",
            &[("user_id", "user-8"), ("prompt", prompt.as_str())],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    let (status, page) = get_json(&app, "/api/submissions?limit=2&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    let submissions = page["submissions"].as_array().expect("submissions");
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0]["prompt"], "Prompt number 1");
    assert_eq!(submissions[1]["prompt"], "Prompt number 0");

    let (_, tail) = get_json(&app, "/api/submissions?limit=100&offset=3").await;
    assert_eq!(tail["total"], 3);
    assert!(tail["submissions"].as_array().expect("submissions").is_empty());
}

#[tokio::test]
async fn blank_prompt_and_missing_user_are_rejected() {
    let app = app_with_generator("irrelevant").await;

    let (status, body) = post_multipart(
        &app,
        "/api/generate",
        &[("user_id", "user-5"), ("prompt", "   ")],
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_PROMPT");

    let (status, body) =
        post_multipart(&app, "/api/generate", &[("prompt", "Write a post")], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_USER_ID");
}

#[tokio::test]
async fn uploaded_markdown_feeds_the_pipeline() {
    let app = app_with_generator("A calm overview written for retirees.").await;

    let (status, body) = post_multipart(
        &app,
        "/api/generate",
        &[("user_id", "user-6"), ("prompt", "Write an overview of our services")],
        Some(("audience-notes.md", "text/markdown", b"Audience: retirees. Tone: calm.")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_approved"], true);

    let submission_id = body["submission_id"].as_str().expect("submission_id");
    let (_, lookup) = get_json(&app, &format!("/api/submissions/{submission_id}")).await;
    assert_eq!(lookup["submission"]["uploaded_file_name"], "audience-notes.md");
    assert_eq!(lookup["submission"]["uploaded_file_type"], "md");
}

#[tokio::test]
async fn binary_upload_in_generate_fails_the_submission() {
    let app = app_with_generator("irrelevant").await;

    let (status, body) = post_multipart(
        &app,
        "/api/generate",
        &[("user_id", "user-7"), ("prompt", "Summarize the attached report")],
        Some(("report.pdf", "application/pdf", b"%PDF-1.7")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "UNSUPPORTED_FILE_TYPE");

    let (_, listed) = get_json(&app, "/api/submissions").await;
    assert_eq!(listed["submissions"][0]["status"], "failed");

    // the file is read during enhancement, so no stage completed past intake
    let submission_id = listed["submissions"][0]["id"].as_str().expect("submission id");
    let (_, lookup) = get_json(&app, &format!("/api/submissions/{submission_id}")).await;
    assert_eq!(lookup["submission"]["stage_reached"], "received");
}

#[tokio::test]
async fn health_reflects_provider_configuration() {
    let app = build_app(test_config());
    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["persistence_enabled"], false);

    let mut config = test_config();
    config.generation_api_url = None;
    let app = build_app(config);
    let (status, body) = get_json(&app, "/api/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
}
