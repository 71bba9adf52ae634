use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::Chunk;

/// What the guardrail decided for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardAction {
    Answer,
    Refuse,
}

/// Why a question was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefusalReason {
    /// Question matched an extraction-intent pattern.
    ExtractionPattern,
    /// Too many consecutive requests for the same context.
    RepeatedContent,
}

impl RefusalReason {
    /// Fixed user-visible explanation.
    pub fn message(&self) -> &'static str {
        match self {
            Self::ExtractionPattern => {
                "I'm not able to extract or display large portions of the document content directly. \
                 This restriction helps protect the document's intellectual property. \
                 However, I can answer specific questions about the content, explain concepts, \
                 summarize sections, or analyze particular elements. \
                 Please try asking a more specific question about the document."
            }
            Self::RepeatedContent => {
                "I've noticed multiple consecutive requests for similar content sections. \
                 To protect the document's integrity, I'll need to limit direct content extraction. \
                 Please try asking a different question or request an analysis rather than direct text."
            }
        }
    }
}

/// Outcome of [`super::Guardrail::evaluate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDecision {
    pub action: GuardAction,
    /// Chunks cleared to inform the answer. Empty on refusal.
    pub context_chunks: Vec<Chunk>,
    pub refusal_reason: Option<RefusalReason>,
}

impl GuardDecision {
    pub(crate) fn answer(context_chunks: Vec<Chunk>) -> Self {
        Self {
            action: GuardAction::Answer,
            context_chunks,
            refusal_reason: None,
        }
    }

    pub(crate) fn refuse(reason: RefusalReason) -> Self {
        Self {
            action: GuardAction::Refuse,
            context_chunks: Vec::new(),
            refusal_reason: Some(reason),
        }
    }

    pub fn is_refusal(&self) -> bool {
        self.action == GuardAction::Refuse
    }
}

/// Cross-request memory of one protected session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardrailState {
    pub consecutive_quote_requests: u32,
    pub previous_chunk_texts: HashSet<String>,
}

impl GuardrailState {
    pub fn new() -> Self {
        Self::default()
    }
}
