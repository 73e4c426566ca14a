use crate::config::environment::AppConfig;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Calls the generation provider with the enhanced prompt. Transient failures
/// are retried up to `generation_max_retries` additional attempts; an
/// unconfigured provider or exhausted retries surface as an error.
pub async fn generate_content(config: &AppConfig, enhanced_prompt: &str) -> Result<String, String> {
    let base = config
        .generation_api_url
        .as_deref()
        .ok_or_else(|| "generation provider is not configured".to_string())?;

    let mut endpoint = format!(
        "{}/v1beta/models/{}:generateContent",
        base.trim_end_matches('/'),
        config.generation_model
    );
    if let Some(key) = &config.generation_api_key {
        endpoint = format!("{endpoint}?key={key}");
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.generation_timeout_seconds))
        .build()
        .map_err(|e| format!("generation client init failed: {e}"))?;

    let mut last_error = String::new();
    for attempt in 0..=config.generation_max_retries {
        match request_generation(&client, &endpoint, enhanced_prompt).await {
            Ok(text) => return Ok(text),
            Err(e) => {
                last_error = e;
                if attempt < config.generation_max_retries {
                    warn!(attempt, error = %last_error, "generation attempt failed, retrying");
                }
            }
        }
    }
    Err(last_error)
}

async fn request_generation(
    client: &Client,
    endpoint: &str,
    prompt: &str,
) -> Result<String, String> {
    let response = client
        .post(endpoint)
        .json(&json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        }))
        .send()
        .await
        .map_err(|e| format!("generation request failed: {e}"))?;

    if !response.status().is_success() {
        return Err(format!(
            "generation provider returned status {}",
            response.status()
        ));
    }

    let payload = response
        .json::<GenerateContentResponse>()
        .await
        .map_err(|e| format!("generation response decode failed: {e}"))?;

    let text = payload
        .candidates
        .and_then(|mut c| c.drain(..).next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .and_then(|mut p| p.drain(..).next())
        .and_then(|p| p.text)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "generation provider returned empty content".to_string())?;
    Ok(text)
}
