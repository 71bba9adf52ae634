//! Page-aware sentence chunking of extracted document text.

pub mod pages;
pub mod sentences;
pub mod chunker;
pub mod topics;

pub use chunker::*;
pub use pages::*;
pub use sentences::*;
pub use topics::*;

use thiserror::Error;

use crate::models::Chunk;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkingError {
    #[error("Sentence splitting failed: {0}")]
    SentenceSplit(String),
}

/// Splits document text into page-tagged chunks.
pub trait Chunker {
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}
