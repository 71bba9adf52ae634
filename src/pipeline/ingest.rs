//! Turn extracted document content into a validated, sealable bundle.

use base64::Engine;
use sha2::{Digest, Sha256};

use super::chunking::{count_page_markers, Chunker, SentenceChunker};
use crate::config::ProtectionConfig;
use crate::crypto::{Vault, VaultError};
use crate::models::{ChartRecord, DocumentBundle, TableRecord, ValidationError};

/// What the upstream extractor hands over for one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentInput<'a> {
    pub document_id: &'a str,
    /// Extracted text with `--- Page N ---` markers.
    pub text: &'a str,
    pub tables: Vec<TableRecord>,
    pub charts: Vec<ChartRecord>,
    /// Original uploaded bytes, if kept.
    pub source: Option<&'a [u8]>,
}

/// Base64 SHA-256 of the given bytes.
pub fn compute_content_hash(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(bytes))
}

/// Chunk the text and assemble a validated bundle.
///
/// The content hash covers the source bytes when present, the text
/// otherwise.
pub fn ingest_document(input: &DocumentInput<'_>, config: &ProtectionConfig) -> Result<DocumentBundle, ValidationError> {
    let chunker = SentenceChunker::new(config.max_chunk_size, config.chunk_overlap);
    let chunks = chunker.chunk(input.text);

    let content_hash = compute_content_hash(input.source.unwrap_or(input.text.as_bytes()));

    let bundle = DocumentBundle {
        id: input.document_id.to_string(),
        full_text: input.text.to_string(),
        chunks,
        tables: input.tables.clone(),
        charts: input.charts.clone(),
        content_hash,
    };
    bundle.validate()?;

    tracing::info!(
        pages = count_page_markers(input.text),
        chunks = bundle.chunks.len(),
        tables = bundle.tables.len(),
        charts = bundle.charts.len(),
        "Document ingested"
    );
    Ok(bundle)
}

/// Ingest and seal: bundle under `<hash>.enc`, source (if any) under
/// `<hash>.source.enc`.
pub fn ingest_and_store(
    vault: &Vault,
    input: &DocumentInput<'_>,
    config: &ProtectionConfig,
) -> Result<DocumentBundle, VaultError> {
    let bundle = ingest_document(input, config)?;
    vault.store_bundle(&bundle)?;
    if let Some(source) = input.source {
        vault.store_source(input.document_id, source)?;
    }
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;

    const TEXT: &str = "--- Page 1 ---\nThe trial enrolled 120 patients. Half received the drug.\n--- Page 2 ---\nOutcomes improved in the treatment arm.";

    fn input<'a>(source: Option<&'a [u8]>) -> DocumentInput<'a> {
        DocumentInput {
            document_id: "trial-report",
            text: TEXT,
            tables: vec![TableRecord::from_extracted_rows(
                2,
                0,
                vec![
                    vec![Some("Arm".into()), Some("n".into())],
                    vec![Some("Drug".into()), Some("60".into())],
                ],
            )],
            charts: vec![ChartRecord::new(2, 0, [0.0, 0.0, 50.0, 50.0])],
            source,
        }
    }

    #[test]
    fn content_hash_deterministic() {
        assert_eq!(compute_content_hash(b"abc"), compute_content_hash(b"abc"));
        assert_ne!(compute_content_hash(b"abc"), compute_content_hash(b"abd"));
        assert_eq!(
            compute_content_hash(b"abc"),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn ingest_chunks_by_page() {
        let bundle = ingest_document(&input(None), &ProtectionConfig::default()).unwrap();
        assert_eq!(bundle.id, "trial-report");
        assert_eq!(bundle.chunks.len(), 2);
        assert_eq!(bundle.chunks[0].page, 1);
        assert_eq!(bundle.chunks[1].page, 2);
        assert_eq!(bundle.content_hash, compute_content_hash(TEXT.as_bytes()));
    }

    #[test]
    fn source_bytes_drive_hash() {
        let pdf = b"%PDF-1.7 body";
        let bundle = ingest_document(&input(Some(pdf)), &ProtectionConfig::default()).unwrap();
        assert_eq!(bundle.content_hash, compute_content_hash(pdf));
    }

    #[test]
    fn invalid_table_rejected() {
        let mut bad = input(None);
        bad.tables[0].rows.push(vec![]);
        assert!(matches!(
            ingest_document(&bad, &ProtectionConfig::default()),
            Err(ValidationError::TableRowWidth { .. })
        ));
    }

    #[test]
    fn ingest_and_store_round_trips_through_vault() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Vault::new(VaultConfig::new(dir.path(), "test-salt"));
        let pdf = b"%PDF-1.7 body".as_slice();

        let bundle = ingest_and_store(&vault, &input(Some(pdf)), &ProtectionConfig::default()).unwrap();
        assert_eq!(vault.load_bundle("trial-report").unwrap(), bundle);
        assert_eq!(vault.load_source("trial-report").unwrap(), pdf);
    }
}
