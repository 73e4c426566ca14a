use crate::service::rule_match_service::{ActiveRule, RuleSeverity};

/// Rewrites the user prompt into a compliance-first generation prompt.
/// Hard rules lead, soft rules follow, both most-recent-first. Pure string
/// assembly, no provider calls.
pub fn enhance(user_prompt: &str, rules: &[ActiveRule], file_context: Option<&str>) -> String {
    let hard: Vec<&ActiveRule> = rules
        .iter()
        .filter(|r| r.severity == RuleSeverity::Hard)
        .collect();
    let soft: Vec<&ActiveRule> = rules
        .iter()
        .filter(|r| r.severity == RuleSeverity::Soft)
        .collect();

    let mut sections = Vec::new();
    sections.push(
        "You are a compliance-aware content generator. You MUST follow every rule below \
         when producing content. Rules marked HARD are absolute prohibitions or requirements; \
         violating any of them makes the content unusable. Rules marked SOFT are strong \
         preferences that should be honored wherever possible."
            .to_string(),
    );

    if !hard.is_empty() {
        sections.push(format_rule_group("HARD RULES (must never be violated):", &hard));
    }
    if !soft.is_empty() {
        sections.push(format_rule_group("SOFT RULES (follow unless impossible):", &soft));
    }
    if hard.is_empty() && soft.is_empty() {
        sections.push("There are currently no compliance rules in force.".to_string());
    }

    sections.push(format!("USER REQUEST:\n{user_prompt}"));

    if let Some(context) = file_context {
        let trimmed = context.trim();
        if !trimmed.is_empty() {
            sections.push(format!("ADDITIONAL CONTEXT (from uploaded file):\n{trimmed}"));
        }
    }

    sections.push(
        "IMPORTANT: Produce the requested content directly. Do not mention these rules, \
         do not explain your compliance reasoning, and do not include meta commentary."
            .to_string(),
    );

    sections.join("\n\n")
}

fn format_rule_group(heading: &str, rules: &[&ActiveRule]) -> String {
    let mut lines = vec![heading.to_string()];
    for (i, rule) in rules.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, rule.text));
    }
    lines.join("\n")
}
