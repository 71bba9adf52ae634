use super::pages::{split_pages, PageText};
use super::sentences::{RuleSentenceSplitter, SentenceSpan, SentenceSplitter};
use super::Chunker;
use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_MAX_CHUNK_SIZE};
use crate::models::Chunk;

/// Sentence-packing chunker with page awareness and sentence overlap.
///
/// A chunk's size is the byte span it covers in the page, whitespace between
/// sentences included, plus one for a trailing separator. A chunk is closed
/// when the next sentence would push it over `max_chunk_size`; the next chunk
/// starts with as many trailing sentences of the closed one as fit in
/// `overlap` (again measured as a page span). Sentences are never split, so
/// one longer than the limit becomes a chunk on its own.
pub struct SentenceChunker<S: SentenceSplitter = RuleSentenceSplitter> {
    splitter: S,
    max_chunk_size: usize,
    overlap: usize,
}

impl SentenceChunker {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self::with_splitter(RuleSentenceSplitter, max_chunk_size, overlap)
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl<S: SentenceSplitter> SentenceChunker<S> {
    pub fn with_splitter(splitter: S, max_chunk_size: usize, overlap: usize) -> Self {
        Self {
            splitter,
            max_chunk_size,
            overlap,
        }
    }

    fn chunk_page(&self, page: &PageText<'_>) -> Vec<Chunk> {
        let sentences = match self.splitter.split(page.text) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(page = page.number, "Sentence split failed, keeping page whole: {e}");
                return whole_page_chunk(page).into_iter().collect();
            }
        };

        let mut chunks = Vec::new();
        let mut current: Vec<&SentenceSpan> = Vec::new();

        for sentence in &sentences {
            let over_budget = current
                .first()
                .is_some_and(|first| cost(first, sentence) > self.max_chunk_size);
            if over_budget {
                chunks.push(build_chunk(page, &current));
                current = self.overlap_seed(&current, sentence);
            }
            current.push(sentence);
        }

        if !current.is_empty() {
            chunks.push(build_chunk(page, &current));
        }
        chunks
    }

    /// Trailing sentences of `closed`, taken whole from the end, whose page
    /// span stays within `overlap` and that still leave room for `incoming`.
    fn overlap_seed<'a>(&self, closed: &[&'a SentenceSpan], incoming: &SentenceSpan) -> Vec<&'a SentenceSpan> {
        let Some(last) = closed.last() else {
            return Vec::new();
        };
        let taken = closed
            .iter()
            .rev()
            .take_while(|first| span(first, last) <= self.overlap && cost(first, incoming) <= self.max_chunk_size)
            .count();
        closed[closed.len() - taken..].to_vec()
    }
}

impl<S: SentenceSplitter> Chunker for SentenceChunker<S> {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = split_pages(text)
            .iter()
            .flat_map(|page| self.chunk_page(page))
            .collect();

        tracing::debug!(chunks = chunks.len(), "Document chunked");
        chunks
    }
}

/// Chunk `text` with the bundled sentence splitter.
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    SentenceChunker::new(max_chunk_size, overlap).chunk(text)
}

/// Bytes of page text from the start of `first` to the end of `last`.
fn span(first: &SentenceSpan, last: &SentenceSpan) -> usize {
    last.end.saturating_sub(first.start)
}

/// Budget charged for a chunk running from `first` to `last`.
fn cost(first: &SentenceSpan, last: &SentenceSpan) -> usize {
    span(first, last) + 1
}

fn build_chunk(page: &PageText<'_>, sentences: &[&SentenceSpan]) -> Chunk {
    let start = sentences.first().map(|s| s.start).unwrap_or_default();
    let end = sentences.last().map(|s| s.end).unwrap_or(start);
    Chunk::from_page_span(
        page.text,
        sentences.iter().map(|s| s.text.clone()).collect(),
        page.number,
        start,
        end,
    )
}

fn whole_page_chunk(page: &PageText<'_>) -> Option<Chunk> {
    let trimmed = page.text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = page.text.len() - page.text.trim_start().len();
    Some(Chunk::from_sentences(
        vec![trimmed.to_string()],
        page.number,
        start,
        start + trimmed.len(),
    ))
}
