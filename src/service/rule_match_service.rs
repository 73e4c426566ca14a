use crate::service::embedding_service;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Hard,
    Soft,
}

impl RuleSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "hard" => Some(Self::Hard),
            "soft" => Some(Self::Soft),
            _ => None,
        }
    }
}

/// Active rule snapshot handed to the evaluation and prompt services.
#[derive(Debug, Clone)]
pub struct ActiveRule {
    pub id: String,
    pub text: String,
    pub severity: RuleSeverity,
}

/// Per-rule violation-detection policy, derived from the rule text.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionPolicy {
    ProhibitedPhrases(Vec<String>),
    RequiredPhrases(Vec<String>),
    SemanticIntent(String),
}

pub fn policy_for(rule_text: &str) -> DetectionPolicy {
    let lower = rule_text.to_lowercase();
    if lower.contains("must not") || lower.contains("prohibited") {
        let mut phrases = quoted_phrases(rule_text);
        if phrases.is_empty() {
            phrases = listed_phrases(&lower);
        }
        if phrases.is_empty() {
            phrases = trailing_phrase(&lower);
        }
        if !phrases.is_empty() {
            return DetectionPolicy::ProhibitedPhrases(phrases);
        }
    } else if lower.contains("must include") || lower.contains("required") {
        let phrases = quoted_phrases(rule_text);
        if !phrases.is_empty() {
            return DetectionPolicy::RequiredPhrases(phrases);
        }
    }
    DetectionPolicy::SemanticIntent(rule_text.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedViolation {
    pub rule_id: String,
    pub rule_text: String,
    pub severity: RuleSeverity,
    pub violated_text: String,
    pub context: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationOutcome {
    pub is_approved: bool,
    pub decision_reason: String,
    pub soft_annotations: String,
    pub violations: Vec<DetectedViolation>,
    pub hard_violations: usize,
    pub soft_violations: usize,
}

/// Authoritative compliance decision. Any hard violation blocks the content;
/// soft violations annotate but never block. An empty rule set approves.
pub fn evaluate(content: &str, rules: &[ActiveRule], semantic_threshold: f32) -> EvaluationOutcome {
    let violations: Vec<DetectedViolation> = rules
        .iter()
        .filter_map(|rule| check_rule(content, rule, semantic_threshold))
        .collect();

    let hard: Vec<&DetectedViolation> = violations
        .iter()
        .filter(|v| v.severity == RuleSeverity::Hard)
        .collect();
    let soft: Vec<&DetectedViolation> = violations
        .iter()
        .filter(|v| v.severity == RuleSeverity::Soft)
        .collect();

    let (is_approved, decision_reason) = if hard.is_empty() {
        (true, "No HARD rule violations".to_string())
    } else {
        let reasons: Vec<String> = hard
            .iter()
            .map(|v| format!("- {}: {}", v.rule_text, v.context))
            .collect();
        (
            false,
            format!(
                "Content BLOCKED due to HARD rule violations:\n{}",
                reasons.join("\n")
            ),
        )
    };

    let soft_annotations = if soft.is_empty() {
        "No SOFT rule violations".to_string()
    } else {
        let mut lines = vec!["SOFT RULE VIOLATIONS (Content approved with warnings):".to_string()];
        lines.extend(soft.iter().map(|v| format!("- {}: {}", v.rule_text, v.context)));
        lines.join("\n")
    };

    EvaluationOutcome {
        is_approved,
        decision_reason,
        soft_annotations,
        hard_violations: hard.len(),
        soft_violations: soft.len(),
        violations,
    }
}

pub fn check_rule(
    content: &str,
    rule: &ActiveRule,
    semantic_threshold: f32,
) -> Option<DetectedViolation> {
    let content_lower = content.to_lowercase();
    match policy_for(&rule.text) {
        DetectionPolicy::ProhibitedPhrases(phrases) => phrases.iter().find_map(|phrase| {
            content_lower.contains(&phrase.to_lowercase()).then(|| DetectedViolation {
                rule_id: rule.id.clone(),
                rule_text: rule.text.clone(),
                severity: rule.severity,
                violated_text: extract_context(content, phrase, 100),
                context: format!("Prohibited term '{phrase}' found in content"),
            })
        }),
        DetectionPolicy::RequiredPhrases(phrases) => phrases.iter().find_map(|phrase| {
            (!content_lower.contains(&phrase.to_lowercase())).then(|| DetectedViolation {
                rule_id: rule.id.clone(),
                rule_text: rule.text.clone(),
                severity: rule.severity,
                violated_text: String::new(),
                context: format!("Required term '{phrase}' missing from content"),
            })
        }),
        DetectionPolicy::SemanticIntent(descriptor) => {
            let descriptor_embedding = embedding_service::embed(&descriptor);
            content
                .split("\n\n")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .find_map(|paragraph| {
                    let score = embedding_service::cosine_similarity(
                        &descriptor_embedding,
                        &embedding_service::embed(paragraph),
                    );
                    (score >= semantic_threshold).then(|| DetectedViolation {
                        rule_id: rule.id.clone(),
                        rule_text: rule.text.clone(),
                        severity: rule.severity,
                        violated_text: truncate_chars(paragraph, 200),
                        context: format!(
                            "Content segment semantically matches rule intent (score {score:.2})"
                        ),
                    })
                })
        }
    }
}

fn quoted_phrases(rule_text: &str) -> Vec<String> {
    rule_text
        .split('"')
        .enumerate()
        .filter(|(i, part)| i % 2 == 1 && !part.trim().is_empty())
        .map(|(_, part)| part.trim().to_string())
        .collect()
}

fn listed_phrases(lower: &str) -> Vec<String> {
    for marker in ["such as", "including"] {
        if let Some((_, tail)) = lower.split_once(marker) {
            let phrases: Vec<String> = tail
                .split(',')
                .map(|t| t.trim().trim_matches(['"', '\'', '.']).trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !phrases.is_empty() {
                return phrases;
            }
        }
    }
    Vec::new()
}

fn trailing_phrase(lower: &str) -> Vec<String> {
    for marker in [
        "must not say",
        "must not mention",
        "must not use",
        "must not include",
        "must not contain",
    ] {
        if let Some((_, tail)) = lower.split_once(marker) {
            let phrase = tail.trim().trim_matches(['"', '\'', '.']).trim();
            if !phrase.is_empty() {
                return vec![phrase.to_string()];
            }
        }
    }
    Vec::new()
}

fn extract_context(content: &str, term: &str, context_chars: usize) -> String {
    let content_lower = content.to_lowercase();
    let term_lower = term.to_lowercase();
    let Some(byte_pos) = content_lower.find(&term_lower) else {
        return term.to_string();
    };

    let chars: Vec<char> = content.chars().collect();
    let char_pos = content_lower[..byte_pos].chars().count().min(chars.len());
    let term_len = term.chars().count();
    let start = char_pos.saturating_sub(context_chars);
    let end = (char_pos + term_len + context_chars).min(chars.len());

    let mut context: String = chars[start..end].iter().collect();
    if start > 0 {
        context = format!("...{context}");
    }
    if end < chars.len() {
        context = format!("{context}...");
    }
    context
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}
