use std::sync::LazyLock;

use regex::Regex;

static PAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"---\s*Page\s+(\d+)\s*---").expect("valid regex"));

/// One page segment of document text, borrowed from the input.
///
/// Chunk offsets are relative to `text`, not to the page number: a preamble
/// before `--- Page 1 ---` is its own segment that shares tag 1 with the
/// marked page. `offset` tells the segments apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText<'a> {
    /// 1-based page tag.
    pub number: u32,
    /// Byte position of `text` in the whole document.
    pub offset: usize,
    /// Raw segment body, untrimmed.
    pub text: &'a str,
}

impl PageText<'_> {
    /// Translate a segment-local byte offset to a document offset.
    pub fn document_offset(&self, local: usize) -> usize {
        self.offset + local
    }
}

/// Split text on `--- Page N ---` markers.
///
/// The captured number is the page tag (a `0` becomes `1`, an unparseable
/// number follows the previous page). Text before the first marker is a
/// separate segment tagged page 1. Blank segments are dropped.
pub fn split_pages(text: &str) -> Vec<PageText<'_>> {
    let mut pages = Vec::new();
    let mut body_start = 0;
    let mut number = 1u32;

    for caps in PAGE_MARKER.captures_iter(text) {
        let Some(marker) = caps.get(0) else { continue };
        push_page(&mut pages, number, body_start, &text[body_start..marker.start()]);

        number = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or_else(|| number.saturating_add(1))
            .max(1);
        body_start = marker.end();
    }
    push_page(&mut pages, number, body_start, &text[body_start..]);

    pages
}

fn push_page<'a>(pages: &mut Vec<PageText<'a>>, number: u32, offset: usize, body: &'a str) {
    if !body.trim().is_empty() {
        pages.push(PageText {
            number,
            offset,
            text: body,
        });
    }
}

/// Number of page markers in `text`.
pub fn count_page_markers(text: &str) -> usize {
    PAGE_MARKER.find_iter(text).count()
}
