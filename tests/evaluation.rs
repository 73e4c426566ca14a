use compliance_gateway::service::chunking_service;
use compliance_gateway::service::embedding_service;
use compliance_gateway::service::prompt_service;
use compliance_gateway::service::rule_match_service::{
    self, ActiveRule, DetectionPolicy, RuleSeverity,
};

fn rule(id: &str, text: &str, severity: RuleSeverity) -> ActiveRule {
    ActiveRule {
        id: id.to_string(),
        text: text.to_string(),
        severity,
    }
}

#[test]
fn empty_rule_set_approves() {
    let outcome = rule_match_service::evaluate("Any content at all.", &[], 0.92);
    assert!(outcome.is_approved);
    assert!(outcome.violations.is_empty());
    assert_eq!(outcome.decision_reason, "No HARD rule violations");
}

#[test]
fn hard_rule_blocks_on_verbatim_phrase() {
    let rules = vec![rule(
        "r1",
        "Marketing copy must not say guaranteed returns",
        RuleSeverity::Hard,
    )];
    let outcome = rule_match_service::evaluate(
        "Sign up today for guaranteed returns on your savings.",
        &rules,
        0.92,
    );
    assert!(!outcome.is_approved);
    assert_eq!(outcome.hard_violations, 1);
    assert_eq!(outcome.violations.len(), 1);
    assert!(outcome.violations[0]
        .violated_text
        .contains("guaranteed returns"));
    assert!(outcome.decision_reason.contains("BLOCKED"));
}

#[test]
fn soft_rule_annotates_without_blocking() {
    let rules = vec![rule("r1", "Content must not mention crypto", RuleSeverity::Soft)];
    let outcome =
        rule_match_service::evaluate("We now support crypto withdrawals.", &rules, 0.92);
    assert!(outcome.is_approved);
    assert_eq!(outcome.soft_violations, 1);
    assert!(outcome.soft_annotations.contains("SOFT RULE VIOLATIONS"));
}

#[test]
fn quoted_phrases_drive_prohibited_matching() {
    let policy = rule_match_service::policy_for(
        "Content must not include \"get rich quick\" or \"zero risk\"",
    );
    assert_eq!(
        policy,
        DetectionPolicy::ProhibitedPhrases(vec![
            "get rich quick".to_string(),
            "zero risk".to_string()
        ])
    );

    let rules = vec![rule(
        "r1",
        "Content must not include \"get rich quick\" or \"zero risk\"",
        RuleSeverity::Hard,
    )];
    let outcome =
        rule_match_service::evaluate("This is not a Get Rich Quick scheme.", &rules, 0.92);
    assert_eq!(outcome.hard_violations, 1);
}

#[test]
fn listed_phrases_after_such_as_are_prohibited() {
    let policy = rule_match_service::policy_for(
        "Posts must not use superlatives such as best in class, world leading",
    );
    assert_eq!(
        policy,
        DetectionPolicy::ProhibitedPhrases(vec![
            "best in class".to_string(),
            "world leading".to_string()
        ])
    );
}

#[test]
fn required_phrase_missing_is_a_violation() {
    let rules = vec![rule(
        "r1",
        "All deposit product posts are required to include \"Member FDIC\"",
        RuleSeverity::Soft,
    )];
    let outcome =
        rule_match_service::evaluate("Open a savings account today.", &rules, 0.92);
    assert_eq!(outcome.soft_violations, 1);
    assert!(outcome.violations[0].context.contains("missing"));

    let outcome = rule_match_service::evaluate(
        "Open a savings account today. Member FDIC.",
        &rules,
        0.92,
    );
    assert!(outcome.violations.is_empty());
}

#[test]
fn violation_context_is_bounded() {
    let filler = "word ".repeat(200);
    let content = format!("{filler}guaranteed returns{filler}");
    let rules = vec![rule(
        "r1",
        "Copy must not say guaranteed returns",
        RuleSeverity::Hard,
    )];
    let outcome = rule_match_service::evaluate(&content, &rules, 0.92);
    let violated = &outcome.violations[0].violated_text;
    assert!(violated.starts_with("..."));
    assert!(violated.ends_with("..."));
    assert!(violated.chars().count() < 250);
}

#[test]
fn identical_text_scores_exactly_one() {
    let text = "Advisors must not promise specific investment outcomes";
    let indexed = vec![(
        "r1".to_string(),
        text.to_string(),
        embedding_service::embed(text),
    )];
    let matches = embedding_service::find_similar(text, &indexed, 0.85, 3);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].similarity_score, 1.0);
}

#[test]
fn unrelated_text_scores_below_threshold() {
    let indexed = vec![(
        "r1".to_string(),
        "Advisors must not promise specific investment outcomes".to_string(),
        embedding_service::embed("Advisors must not promise specific investment outcomes"),
    )];
    let matches =
        embedding_service::find_similar("The weather is pleasant today", &indexed, 0.85, 3);
    assert!(matches.is_empty());
}

#[test]
fn formatting_differences_still_match() {
    let indexed = vec![(
        "r1".to_string(),
        "Advisors must not promise guaranteed returns.".to_string(),
        embedding_service::embed("Advisors must not promise guaranteed returns."),
    )];
    let matches = embedding_service::find_similar(
        "advisors MUST NOT promise guaranteed returns",
        &indexed,
        0.85,
        3,
    );
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].similarity_score, 1.0);
}

#[test]
fn token_counts_round_up() {
    assert_eq!(chunking_service::count_tokens(""), 0);
    assert_eq!(chunking_service::count_tokens("abcd"), 1);
    assert_eq!(chunking_service::count_tokens("abcde"), 2);
}

#[test]
fn blank_text_yields_no_chunks() {
    assert!(chunking_service::chunk_content("   \n\n  ", "prompt", 300, 500).is_empty());
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = chunking_service::chunk_content("A short prompt.", "prompt", 300, 500);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].chunk_position, 0);
    assert_eq!(chunks[0].source_type, "prompt");
}

#[test]
fn long_text_splits_into_bounded_chunks() {
    let paragraph = "This sentence is being repeated to build a long paragraph for testing. ";
    let text = paragraph.repeat(60);
    let chunks = chunking_service::chunk_content(&text, "generated", 300, 500);
    assert!(chunks.len() > 1);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_position, i as u32);
        assert!(chunk.token_count <= 520, "chunk {i} too large: {}", chunk.token_count);
    }
}

#[test]
fn enhanced_prompt_puts_hard_rules_before_soft() {
    let rules = vec![
        rule("r1", "Copy must not say guaranteed returns", RuleSeverity::Hard),
        rule("r2", "Prefer plain language", RuleSeverity::Soft),
    ];
    let enhanced = prompt_service::enhance("Write a savings pitch", &rules, Some("Audience: retirees"));
    let hard_pos = enhanced.find("HARD RULES").expect("hard section");
    let soft_pos = enhanced.find("SOFT RULES").expect("soft section");
    let request_pos = enhanced.find("USER REQUEST").expect("request section");
    assert!(hard_pos < soft_pos);
    assert!(soft_pos < request_pos);
    assert!(enhanced.contains("Audience: retirees"));
}
