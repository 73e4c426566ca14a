use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ContentChunk {
    pub chunk_text: String,
    pub chunk_position: u32,
    pub token_count: usize,
    pub source_type: String,
}

/// Approximate token count, four characters per token rounded up.
pub fn count_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    chars.div_ceil(4)
}

/// Splits text into chunks of roughly `min_tokens`..`max_tokens`, preferring
/// paragraph boundaries and falling back to sentence boundaries for paragraphs
/// that are too long on their own. Blank input yields no chunks.
pub fn chunk_content(
    text: &str,
    source_type: &str,
    min_tokens: usize,
    max_tokens: usize,
) -> Vec<ContentChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut pieces = Vec::new();
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if count_tokens(paragraph) > max_tokens {
            pieces.extend(split_sentences(paragraph));
        } else {
            pieces.push(paragraph.to_string());
        }
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    for piece in pieces {
        let candidate_tokens = count_tokens(&current) + count_tokens(&piece);
        if !current.is_empty() && candidate_tokens > max_tokens {
            push_chunk(&mut chunks, &current, source_type);
            current.clear();
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&piece);
        if count_tokens(&current) >= min_tokens {
            push_chunk(&mut chunks, &current, source_type);
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        push_chunk(&mut chunks, &current, source_type);
    }
    chunks
}

fn push_chunk(chunks: &mut Vec<ContentChunk>, text: &str, source_type: &str) {
    let trimmed = text.trim();
    chunks.push(ContentChunk {
        chunk_text: trimmed.to_string(),
        chunk_position: chunks.len() as u32,
        token_count: count_tokens(trimmed),
        source_type: source_type.to_string(),
    });
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().map_or(true, |n| n.is_whitespace()) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    sentences
}
