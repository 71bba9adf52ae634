use std::collections::HashSet;

use super::patterns::match_extraction_pattern;
use super::types::{GuardDecision, GuardrailState, RefusalReason};
use crate::config::{ProtectionConfig, DEFAULT_MAX_CONSECUTIVE_QUOTES, DEFAULT_TOP_K};
use crate::models::Chunk;
use crate::pipeline::rag::retrieval::relevant_chunks;

/// Decides whether a question may be answered and with which chunks.
///
/// Two checks, in order:
/// 1. Extraction-intent patterns refuse outright and leave state alone.
/// 2. Repetition: when the retrieved context overlaps the previous call's
///    context and the overlap streak has already reached the threshold, the
///    call refuses and the streak resets. Otherwise the context is recorded
///    and the streak grows by one on overlap.
///
/// A non-overlapping request does not reset the streak.
#[derive(Debug, Clone)]
pub struct Guardrail {
    top_k: usize,
    max_consecutive_quotes: u32,
}

impl Default for Guardrail {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K, DEFAULT_MAX_CONSECUTIVE_QUOTES)
    }
}

impl Guardrail {
    pub fn new(top_k: usize, max_consecutive_quotes: u32) -> Self {
        Self {
            top_k,
            max_consecutive_quotes,
        }
    }

    pub fn from_config(config: &ProtectionConfig) -> Self {
        Self::new(config.top_k, config.max_consecutive_quotes)
    }

    pub fn evaluate(&self, state: &mut GuardrailState, question: &str, chunks: &[Chunk]) -> GuardDecision {
        if let Some(pattern) = match_extraction_pattern(question) {
            tracing::info!(pattern = pattern.label, "Question refused: extraction pattern");
            return GuardDecision::refuse(RefusalReason::ExtractionPattern);
        }

        let context_chunks = relevant_chunks(question, chunks, self.top_k);
        let context_texts: HashSet<String> = context_chunks.iter().map(|c| c.text.clone()).collect();
        let overlaps = !context_texts.is_disjoint(&state.previous_chunk_texts);

        if overlaps && state.consecutive_quote_requests >= self.max_consecutive_quotes {
            tracing::info!(
                streak = state.consecutive_quote_requests,
                "Question refused: repeated content requests"
            );
            state.consecutive_quote_requests = 0;
            return GuardDecision::refuse(RefusalReason::RepeatedContent);
        }

        state.previous_chunk_texts = context_texts;
        if overlaps {
            state.consecutive_quote_requests += 1;
        }

        tracing::debug!(
            context = context_chunks.len(),
            streak = state.consecutive_quote_requests,
            "Question cleared"
        );
        GuardDecision::answer(context_chunks)
    }
}
