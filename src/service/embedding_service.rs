use sha2::{Digest, Sha256};

pub const EMBEDDING_DIMENSIONS: usize = 1024;

/// Lowercases, strips punctuation and collapses whitespace so that texts
/// differing only in formatting embed identically.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministic text embedding: SHA-256 expanded over a counter to 1024
/// centered lanes, L2-normalized. Normalized-identical text always embeds
/// identically; unrelated text scores near zero cosine similarity.
pub fn embed(text: &str) -> Vec<f32> {
    let normalized = normalize(text);
    let mut lanes = Vec::with_capacity(EMBEDDING_DIMENSIONS);
    let mut counter: u32 = 0;
    while lanes.len() < EMBEDDING_DIMENSIONS {
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update(counter.to_be_bytes());
        for byte in hasher.finalize() {
            if lanes.len() == EMBEDDING_DIMENSIONS {
                break;
            }
            lanes.push(f32::from(byte) - 127.5);
        }
        counter += 1;
    }

    let norm = lanes.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for lane in &mut lanes {
            *lane /= norm;
        }
    }
    lanes
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SimilarRuleMatch {
    pub rule_id: String,
    pub rule_text: String,
    pub similarity_score: f32,
}

/// Compare candidate text against indexed active rules. A normalized text
/// match scores 1.0 regardless of float rounding; everything else is cosine
/// similarity of the deterministic embeddings. Matches at or above the
/// threshold are returned sorted descending, capped at `top_k`.
pub fn find_similar(
    text: &str,
    indexed: &[(String, String, Vec<f32>)],
    threshold: f32,
    top_k: usize,
) -> Vec<SimilarRuleMatch> {
    let candidate = embed(text);
    let normalized = normalize(text);
    let mut matches: Vec<SimilarRuleMatch> = indexed
        .iter()
        .filter_map(|(rule_id, rule_text, embedding)| {
            let score = if normalize(rule_text) == normalized {
                1.0
            } else {
                cosine_similarity(&candidate, embedding)
            };
            (score >= threshold).then(|| SimilarRuleMatch {
                rule_id: rule_id.clone(),
                rule_text: rule_text.clone(),
                similarity_score: score,
            })
        })
        .collect();
    matches.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(top_k);
    matches
}
