use crate::config::environment::AppConfig;
use crate::service::rule_match_service::ActiveRule;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewFinding {
    pub description: String,
    pub source: String,
}

/// Advisory second-opinion review. Never decides: the rule engine remains
/// authoritative, and an unavailable reviewer degrades to `available: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisoryReview {
    pub available: bool,
    pub violations: Vec<ReviewFinding>,
    pub recommendations: String,
}

impl AdvisoryReview {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            violations: Vec::new(),
            recommendations: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub async fn review_content(
    config: &AppConfig,
    content: &str,
    rules: &[ActiveRule],
) -> Result<AdvisoryReview, String> {
    let base = config
        .review_api_url
        .as_deref()
        .ok_or_else(|| "review provider is not configured".to_string())?;
    let endpoint = format!("{}/chat/completions", base.trim_end_matches('/'));

    let client = Client::builder()
        .timeout(Duration::from_secs(config.review_timeout_seconds))
        .build()
        .map_err(|e| format!("review client init failed: {e}"))?;

    let mut request = client.post(&endpoint).json(&json!({
        "model": config.review_model,
        "messages": [
            {
                "role": "system",
                "content": "You are a strict compliance reviewer. Report rule violations \
                            and improvement recommendations exactly in the requested format."
            },
            { "role": "user", "content": build_review_prompt(content, rules) }
        ],
        "temperature": 0.1,
        "max_tokens": 2000
    }));
    if let Some(key) = &config.review_api_key {
        request = request.bearer_auth(key);
    }

    let response = request
        .send()
        .await
        .map_err(|e| format!("review request failed: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("review provider returned status {}", response.status()));
    }

    let payload = response
        .json::<ChatCompletionResponse>()
        .await
        .map_err(|e| format!("review response decode failed: {e}"))?;
    let text = payload
        .choices
        .and_then(|mut c| c.drain(..).next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| "review provider returned empty content".to_string())?;

    Ok(parse_review(&text))
}

fn build_review_prompt(content: &str, rules: &[ActiveRule]) -> String {
    let rule_lines: Vec<String> = rules
        .iter()
        .map(|r| format!("- [{}] {}", r.severity.as_str().to_uppercase(), r.text))
        .collect();
    let rules_section = if rule_lines.is_empty() {
        "(no rules in force)".to_string()
    } else {
        rule_lines.join("\n")
    };
    format!(
        "Review the following content against these compliance rules.\n\n\
         RULES:\n{rules_section}\n\n\
         CONTENT:\n{content}\n\n\
         Respond in exactly this format:\n\
         VIOLATIONS:\n\
         <one violation per line, or NONE>\n\
         RECOMMENDATIONS:\n\
         <improvement recommendations, or NONE>"
    )
}

/// Parses the VIOLATIONS:/RECOMMENDATIONS: sections of the reviewer output.
/// A missing or NONE section yields no findings.
fn parse_review(text: &str) -> AdvisoryReview {
    let (violations_part, recommendations_part) = match text.split_once("RECOMMENDATIONS:") {
        Some((head, tail)) => (head, tail.trim().to_string()),
        None => (text, String::new()),
    };

    let violations_section = violations_part
        .split_once("VIOLATIONS:")
        .map(|(_, tail)| tail)
        .unwrap_or("");
    let violations: Vec<ReviewFinding> = violations_section
        .lines()
        .map(str::trim)
        .map(|line| line.trim_start_matches(['-', '*']).trim())
        .filter(|line| !line.is_empty() && !line.eq_ignore_ascii_case("none"))
        .map(|line| ReviewFinding {
            description: line.to_string(),
            source: "advisory_review".to_string(),
        })
        .collect();

    let recommendations = if recommendations_part.eq_ignore_ascii_case("none") {
        String::new()
    } else {
        recommendations_part
    };

    AdvisoryReview {
        available: true,
        violations,
        recommendations,
    }
}
