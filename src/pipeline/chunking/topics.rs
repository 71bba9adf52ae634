use crate::models::Chunk;

/// Keyword table for coarse topic tagging. A chunk gets every topic whose
/// keywords appear in it (substring match, lowercase).
const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("introduction", &["introduction", "overview", "background", "begin", "start"]),
    ("methodology", &["method", "approach", "procedure", "technique", "algorithm"]),
    ("results", &["result", "finding", "outcome", "analysis", "data", "figure", "table"]),
    ("discussion", &["discuss", "implication", "interpret", "meaning", "significance"]),
    ("conclusion", &["conclusion", "summary", "future work", "recommend", "end"]),
    ("reference", &["reference", "citation", "bibliography", "cite", "source"]),
    ("code", &["function", "class", "method", "variable", "code", "algorithm", "pseudo"]),
];

pub const FALLBACK_TOPIC: &str = "content";

/// Topics for a piece of text, in table order. Never empty.
pub fn identify_topics(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let topics: Vec<&'static str> = TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(topic, _)| *topic)
        .collect();

    if topics.is_empty() {
        vec![FALLBACK_TOPIC]
    } else {
        topics
    }
}

/// Topics for each chunk, index-aligned with `chunks`.
pub fn tag_chunks(chunks: &[Chunk]) -> Vec<Vec<&'static str>> {
    chunks.iter().map(|c| identify_topics(&c.text)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_map_to_topics() {
        assert_eq!(identify_topics("The analysis of our findings"), vec!["results"]);
        assert_eq!(
            identify_topics("This method uses a new algorithm"),
            vec!["methodology", "code"]
        );
    }

    #[test]
    fn untagged_text_falls_back() {
        assert_eq!(identify_topics("Cats sleep a lot."), vec![FALLBACK_TOPIC]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(identify_topics("BIBLIOGRAPHY").contains(&"reference"));
    }

    #[test]
    fn tags_align_with_chunks() {
        let chunks = vec![
            Chunk::from_sentences(vec!["In conclusion, it works.".into()], 1, 0, 24),
            Chunk::from_sentences(vec!["Cats sleep.".into()], 2, 0, 11),
        ];
        let tags = tag_chunks(&chunks);
        assert!(tags[0].contains(&"conclusion"));
        assert_eq!(tags[1], vec![FALLBACK_TOPIC]);
    }
}
