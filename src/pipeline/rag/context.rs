use serde::{Deserialize, Serialize};

use crate::models::Chunk;

/// English text averages ~4 chars/token for subword tokenizers.
const CHARS_PER_TOKEN: usize = 4;

/// Context handed to the generator, after budgeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    pub estimated_tokens: usize,
    /// Pages of the chunks that contributed, in context order.
    pub pages: Vec<u32>,
    pub truncated: bool,
}

/// Rough token count.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / CHARS_PER_TOKEN
}

/// Cut `text` to roughly `max_tokens` tokens, marking the cut with `...`.
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    let mut limit = (max_tokens * CHARS_PER_TOKEN).min(text.len());
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }
    format!("{}...", &text[..limit])
}

/// Join selected chunks into one context block within the token budget.
pub fn assemble_context(chunks: &[Chunk], max_tokens: usize) -> AssembledContext {
    let mut joined = String::new();
    for chunk in chunks {
        joined.push('\n');
        joined.push_str(&chunk.text);
        joined.push('\n');
    }

    let text = truncate_to_tokens(&joined, max_tokens);
    let truncated = text.len() != joined.len();
    if truncated {
        tracing::debug!(budget = max_tokens, "Context truncated to token budget");
    }

    AssembledContext {
        estimated_tokens: estimate_tokens(&text),
        pages: chunks.iter().map(|c| c.page).collect(),
        truncated,
        text,
    }
}
