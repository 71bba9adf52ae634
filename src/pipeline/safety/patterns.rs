use std::sync::LazyLock;

use regex::Regex;

/// A compiled extraction-intent pattern with a short label for logs.
pub struct ExtractionPattern {
    regex: Regex,
    pub label: &'static str,
}

impl ExtractionPattern {
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Requests for wholesale or sequential reproduction of the document.
static EXTRACTION_PATTERNS: LazyLock<Vec<ExtractionPattern>> = LazyLock::new(|| {
    vec![
        pattern(
            r"(?i)\b(?:extract|copy|paste|reproduce|dump|print|output)\s+(?:all\s+(?:of\s+)?)?(?:the\s+|this\s+|your\s+)?(?:all|complete|entire|full|whole)\s+(?:text|contents?|document|assignment|pdf|file)\b",
            "bulk extraction verb",
        ),
        pattern(
            r"(?i)\b(?:show|give|provide|send|tell)\s+(?:me\s+|us\s+)?(?:the\s+|this\s+)?(?:all|complete|entire|full|whole)\s+(?:text|contents?|document|assignment|pdf|file)\b",
            "bulk display request",
        ),
        pattern(
            r"(?i)\b(?:show|give|provide|print|read|tell)\s+(?:me\s+|us\s+)?(?:the\s+)?(?:next|previous|following|remaining|rest)\s+(?:of\s+the\s+)?(?:part|section|page|paragraph|text|contents?)\b",
            "sequential section request",
        ),
        pattern(
            r"(?i)\bcontinue\s+(?:from|where\s+you\s+left\s+off)",
            "continuation request",
        ),
        pattern(
            "(?i)\\b(?:what|show)\\s+(?:is|are|comes)\\s+(?:after|before)\\s+[\"'\u{201C}\u{2018}].*?[\"'\u{201D}\u{2019}]",
            "quoted anchor request",
        ),
    ]
});

/// Phrasings that walk through a document piece by piece.
static SEQUENTIAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bcontinue",
        r"(?i)\bnext\s+part\b",
        r"(?i)\bmore\s+details\b",
        r"(?i)\bnext\s+section\b",
        r"(?i)\bgo\s+on\b",
        r"(?i)\bproceed",
        r"(?i)\bthen\s+what\b",
        r"(?i)\bwhat\s+follows\b",
        r"(?i)\bwhat\s+happens\s+next\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

fn pattern(regex: &str, label: &'static str) -> ExtractionPattern {
    ExtractionPattern {
        regex: Regex::new(regex).expect("valid regex"),
        label,
    }
}

/// First extraction-intent pattern the question matches, if any.
pub fn match_extraction_pattern(question: &str) -> Option<&'static ExtractionPattern> {
    EXTRACTION_PATTERNS.iter().find(|p| p.is_match(question))
}

pub fn is_extraction_request(question: &str) -> bool {
    match_extraction_pattern(question).is_some()
}

/// Whether the question reads like "keep going" rather than a new question.
pub fn is_sequential_request(question: &str) -> bool {
    SEQUENTIAL_PATTERNS.iter().any(|re| re.is_match(question))
}
