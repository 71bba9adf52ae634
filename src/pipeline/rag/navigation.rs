//! Reader navigation aids: detected section headings and suggested
//! follow-up questions.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::orchestrator::AnswerGenerator;
use super::prompt::{build_navigation_prompt, NAVIGATION_SYSTEM_PROMPT};
use crate::models::Chunk;

/// Characters sampled from each of the first, middle and last chunk.
const SAMPLE_CHARS: usize = 500;
pub const MAX_SUGGESTIONS: usize = 6;
const PREVIEW_CHARS: usize = 100;

pub const FALLBACK_SUGGESTIONS: [&str; MAX_SUGGESTIONS] = [
    "What are the main findings or conclusions in this document?",
    "How does the methodology section approach the problem?",
    "What evidence supports the key arguments in this work?",
    "Are there any limitations discussed in the document?",
    "How does this work compare to existing research or approaches?",
    "What are the implications of these findings for the field?",
];

static HEADING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^#+\s+(.+)$",                         // Markdown headings
        r"^([A-Z][A-Za-z\s]+):$",               // "Title:" lines
        r"^([A-Z][A-Za-z\s]+)$",                // Capitalized standalone line
        r"^(\d+\.[\d.]*\s+[A-Z][A-Za-z\s]+)$",  // Numbered headings
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

const IGNORED_TITLES: [&str; 3] = ["note", "figure", "table"];

/// A heading found in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub title: String,
    pub page: u32,
    pub preview: String,
}

/// Scan chunk lines for headings. Repeats from chunk overlap are collapsed.
pub fn identify_sections(chunks: &[Chunk]) -> Vec<SectionEntry> {
    let mut sections: Vec<SectionEntry> = Vec::new();

    for chunk in chunks {
        for line in chunk.text.lines() {
            let Some(title) = heading_title(line.trim()) else {
                continue;
            };
            let duplicate = sections
                .iter()
                .any(|s| s.page == chunk.page && s.title == title);
            if duplicate {
                continue;
            }
            sections.push(SectionEntry {
                title,
                page: chunk.page,
                preview: format!("{}...", take_chars(&chunk.text, PREVIEW_CHARS)),
            });
        }
    }
    sections
}

fn heading_title(line: &str) -> Option<String> {
    let title = HEADING_PATTERNS
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())?;

    let lower = title.to_lowercase();
    if title.chars().count() <= 3 || IGNORED_TITLES.contains(&lower.as_str()) {
        return None;
    }
    Some(title)
}

fn take_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Beginning, middle and end of the document, 500 characters each.
pub fn document_sample(chunks: &[Chunk]) -> String {
    let Some(first) = chunks.first() else {
        return String::new();
    };
    let mut sample = format!("{}\n\n", take_chars(&first.text, SAMPLE_CHARS));
    if chunks.len() > 2 {
        sample.push_str(take_chars(&chunks[chunks.len() / 2].text, SAMPLE_CHARS));
        sample.push_str("\n\n");
    }
    if let Some(last) = chunks.last() {
        sample.push_str(take_chars(&last.text, SAMPLE_CHARS));
    }
    sample
}

/// Ask the generator for follow-up questions. Any failure, or a reply with
/// no usable questions, yields the fixed fallback list.
pub fn suggest_questions<G: AnswerGenerator + ?Sized>(
    generator: &G,
    chunks: &[Chunk],
    previous: Option<(&str, &str)>,
) -> Vec<String> {
    let prompt = build_navigation_prompt(&document_sample(chunks), previous);

    let parsed = match generator.generate(NAVIGATION_SYSTEM_PROMPT, &prompt) {
        Ok(raw) => parse_suggestions(&raw),
        Err(e) => {
            tracing::warn!("Navigation suggestions failed: {e}");
            Vec::new()
        }
    };

    if parsed.is_empty() {
        return fallback_suggestions();
    }
    parsed
}

pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

/// Accepts a JSON array of strings, or an object holding one (under
/// `questions` or, failing that, the first array-valued key).
fn parse_suggestions(raw: &str) -> Vec<String> {
    let value: serde_json::Value = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Suggestion reply is not JSON: {e}");
            return Vec::new();
        }
    };

    let array = match &value {
        serde_json::Value::Array(items) => Some(items),
        serde_json::Value::Object(map) => map
            .get("questions")
            .and_then(|v| v.as_array())
            .or_else(|| map.values().find_map(|v| v.as_array())),
        _ => None,
    };

    array
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .take(MAX_SUGGESTIONS)
                .collect()
        })
        .unwrap_or_default()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
