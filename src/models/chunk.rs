use serde::{Deserialize, Serialize};

/// A page-tagged slice of document text, the unit of retrieval and answering.
///
/// `start_char`/`end_char` are byte offsets into the page segment the chunk
/// was cut from, and `text` is exactly that slice, so
/// `end_char - start_char == text.len()`. `sentences` are the trimmed
/// sentences inside it. Chunks are immutable once the chunker emits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chunk {
    pub text: String,
    pub page: u32,
    pub start_char: usize,
    pub end_char: usize,
    pub sentences: Vec<String>,
}

impl Chunk {
    /// Build a chunk from whole sentences, joined by a single space.
    pub fn from_sentences(sentences: Vec<String>, page: u32, start_char: usize, end_char: usize) -> Self {
        Self {
            text: sentences.join(" "),
            page,
            start_char,
            end_char,
            sentences,
        }
    }

    /// Cut `page_text[start_char..end_char]`. A span that does not fall on
    /// char boundaries inside the page yields the sentences joined instead.
    pub fn from_page_span(page_text: &str, sentences: Vec<String>, page: u32, start_char: usize, end_char: usize) -> Self {
        match page_text.get(start_char..end_char) {
            Some(text) => Self {
                text: text.to_string(),
                page,
                start_char,
                end_char,
                sentences,
            },
            None => {
                let chunk = Self::from_sentences(sentences, page, start_char, start_char);
                let end_char = start_char + chunk.text.len();
                Self { end_char, ..chunk }
            }
        }
    }

    /// Byte span covered in the page.
    pub fn span(&self) -> usize {
        self.end_char.saturating_sub(self.start_char)
    }
}
