//! Post-generation quote-length enforcement.
//!
//! The generator is told to keep verbatim quotes short; this is the backstop
//! when it doesn't. Runs on every generated answer before it leaves the crate.

use std::sync::LazyLock;

use regex::{Captures, Regex};

const ELLIPSIS: &str = "...";

/// ASCII double-quoted spans. Quotes pair left to right.
static QUOTED_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("valid regex"));

/// Truncate every double-quoted span whose content is longer than
/// `max_quote_len` characters to `max_quote_len - 3` characters plus `...`,
/// keeping the quotation marks. Idempotent.
pub fn sanitize(answer: &str, max_quote_len: usize) -> String {
    QUOTED_SPAN_RE
        .replace_all(answer, |caps: &Captures<'_>| {
            let content = &caps[1];
            if content.chars().count() <= max_quote_len {
                return caps[0].to_string();
            }
            let keep = max_quote_len.saturating_sub(ELLIPSIS.len());
            let cut = content
                .char_indices()
                .nth(keep)
                .map(|(i, _)| i)
                .unwrap_or(content.len());
            format!("\"{}{ELLIPSIS}\"", &content[..cut])
        })
        .into_owned()
}

/// Number of quoted spans longer than `max_quote_len` characters.
pub fn count_long_quotes(answer: &str, max_quote_len: usize) -> usize {
    QUOTED_SPAN_RE
        .captures_iter(answer)
        .filter(|caps| caps[1].chars().count() > max_quote_len)
        .count()
}
