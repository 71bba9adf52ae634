use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Chunk;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid regex"));

/// Lowercased word tokens of `text`, deduplicated.
pub fn query_tokens(text: &str) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    WORD_RE
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Number of tokens that occur anywhere in the chunk (substring match,
/// presence not frequency).
pub fn score_chunk(tokens: &BTreeSet<String>, chunk: &Chunk) -> usize {
    let lower = chunk.text.to_lowercase();
    tokens.iter().filter(|t| lower.contains(t.as_str())).count()
}

/// Lexical top-k retrieval.
///
/// Chunks are ranked by [`score_chunk`], ties keep document order. Chunks
/// with no matching token are dropped; when nothing matches the first chunk
/// is returned so the generator always sees some context. A `top_k` of zero
/// behaves like one.
pub fn relevant_chunks(query: &str, chunks: &[Chunk], top_k: usize) -> Vec<Chunk> {
    let Some(first) = chunks.first() else {
        return Vec::new();
    };

    let tokens = query_tokens(query);
    let mut scored: Vec<(usize, &Chunk)> = chunks
        .iter()
        .map(|c| (score_chunk(&tokens, c), c))
        .filter(|(score, _)| *score > 0)
        .collect();
    // sort_by is stable: equal scores keep chunk order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    if scored.is_empty() {
        return vec![first.clone()];
    }

    scored
        .into_iter()
        .take(top_k.max(1))
        .map(|(_, c)| c.clone())
        .collect()
}
