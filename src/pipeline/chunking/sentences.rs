use super::ChunkingError;

/// A trimmed sentence with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Sentence segmentation seam. The bundled [`RuleSentenceSplitter`] needs no
/// external resources; other implementations may fail, in which case the
/// chunker degrades to whole-page chunks.
pub trait SentenceSplitter {
    fn split(&self, text: &str) -> Result<Vec<SentenceSpan>, ChunkingError>;
}

/// Lowercased tokens (including the final period) that never end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "sr.", "jr.", "st.", "mt.", "vs.", "etc.", "e.g.",
    "i.e.", "cf.", "al.", "approx.", "fig.", "figs.", "eq.", "no.", "nos.", "vol.", "pp.", "p.",
    "ch.", "sec.", "inc.", "ltd.", "co.", "corp.", "dept.", "jan.", "feb.", "mar.", "apr.",
    "jun.", "jul.", "aug.", "sep.", "sept.", "oct.", "nov.", "dec.",
];

const TERMINATORS: [char; 3] = ['.', '!', '?'];
const CLOSERS: [char; 7] = ['"', '\'', ')', ']', '}', '\u{201D}', '\u{2019}'];

/// Punctuation-driven splitter.
///
/// A sentence ends at `.`, `!` or `?` (plus any closing quotes or brackets)
/// followed by whitespace, unless the token before the period is a known
/// abbreviation or the next word starts lowercase.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSentenceSplitter;

impl SentenceSplitter for RuleSentenceSplitter {
    fn split(&self, text: &str) -> Result<Vec<SentenceSpan>, ChunkingError> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if !TERMINATORS.contains(&c) {
                continue;
            }

            // Swallow runs like "?!" or ".)" so the boundary lands after them.
            let mut end = i + c.len_utf8();
            while let Some(&(j, next)) = chars.peek() {
                if TERMINATORS.contains(&next) || CLOSERS.contains(&next) {
                    end = j + next.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }

            let rest = &text[end..];
            let followed_by_space = rest.chars().next().map_or(true, char::is_whitespace);
            if !followed_by_space {
                continue;
            }
            if c == '.' && ends_with_abbreviation(&text[start..end]) {
                continue;
            }
            let next_word_lower = rest
                .trim_start()
                .chars()
                .next()
                .is_some_and(char::is_lowercase);
            if next_word_lower {
                continue;
            }

            push_span(&mut spans, text, start, end);
            start = end;
        }
        push_span(&mut spans, text, start, text.len());

        Ok(spans)
    }
}

fn ends_with_abbreviation(sentence: &str) -> bool {
    let token = sentence
        .trim_end_matches(|c| CLOSERS.contains(&c))
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(|c: char| CLOSERS.contains(&c) || c == '(' || c == '[' || c == '"');
    let lower = token.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

fn push_span(spans: &mut Vec<SentenceSpan>, text: &str, start: usize, end: usize) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    spans.push(SentenceSpan {
        text: trimmed.to_string(),
        start: start + lead,
        end: start + lead + trimmed.len(),
    });
}
