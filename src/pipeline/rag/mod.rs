pub mod retrieval;
pub mod context;
pub mod prompt;
pub mod navigation;
pub mod orchestrator;

pub use orchestrator::{AnswerGenerator, QaOutcome, SecureQa};
pub use retrieval::relevant_chunks;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("Answer generation timed out")]
    Timeout,

    #[error("Session state unavailable")]
    SessionUnavailable,
}

impl RagError {
    /// Message safe to show the reader. Generation problems are transient
    /// from their point of view; nothing here is retried automatically.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Generation(_) | Self::Timeout => {
                "I couldn't generate an answer just now. Please try again or rephrase your question."
            }
            Self::SessionUnavailable => "This session is no longer available. Please start a new one.",
        }
    }
}
