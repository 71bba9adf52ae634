//! Per-document encryption at rest.
//!
//! Every document gets its own AES-256-GCM key, derived from the document id
//! and the deployment salt. Nothing key-related is persisted: whoever knows
//! the id (and the deployment runs with the same salt) can reopen the file,
//! nobody else can.
//!
//! Layout under `data_dir`:
//! - `<sha256(id)>.enc`        JSON document bundle
//! - `<sha256(id)>.source.enc` original uploaded file, raw bytes

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::encryption::{EncryptedData, PayloadKind};
use super::keys::DocumentKey;
use super::secure_delete::{cleanup_partial_writes, secure_delete_file, PARTIAL_WRITE_EXTENSION};
use super::{CryptoError, VaultError};
use crate::config::VaultConfig;
use crate::models::{DocumentBundle, ValidationError};

/// Encrypted document store. Holds no mutable state; safe to share across
/// threads.
#[derive(Debug, Clone)]
pub struct Vault {
    config: VaultConfig,
}

impl Vault {
    pub fn new(config: VaultConfig) -> Self {
        Self {
            config: config.normalized(),
        }
    }

    /// Vault configured from the environment.
    pub fn from_env() -> Self {
        Self::new(VaultConfig::from_env())
    }

    /// Create the data directory and clear staging files from crashed writes.
    pub fn open(config: VaultConfig) -> Result<Self, VaultError> {
        let vault = Self::new(config);
        fs::create_dir_all(&vault.config.data_dir)?;
        cleanup_partial_writes(&vault.config.data_dir);
        Ok(vault)
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn derive_key(&self, document_id: &str) -> DocumentKey {
        DocumentKey::derive(
            document_id,
            self.config.salt.as_bytes(),
            self.config.kdf_iterations,
        )
    }

    // ── Payload encryption ──────────────────────────────────

    /// Serialize `payload` to JSON and seal it under the document's key.
    /// Output is `[12-byte nonce][ciphertext + tag]`.
    pub fn encrypt<T: Serialize>(&self, payload: &T, document_id: &str) -> Result<Vec<u8>, CryptoError> {
        let plaintext = serde_json::to_vec(payload)?;
        let key = self.derive_key(document_id);
        Ok(key.encrypt(PayloadKind::Bundle, &plaintext)?.to_bytes())
    }

    /// Open and decode a payload sealed by [`Vault::encrypt`].
    ///
    /// Authentication problems are [`VaultError::Crypto`]; plaintext that
    /// does not decode as `T` is [`VaultError::Malformed`] and carries only
    /// the error position.
    pub fn decrypt<T: DeserializeOwned>(&self, bytes: &[u8], document_id: &str) -> Result<T, VaultError> {
        let encrypted = EncryptedData::from_bytes(bytes)?;
        let key = self.derive_key(document_id);
        let plaintext = key.decrypt(PayloadKind::Bundle, &encrypted)?;
        serde_json::from_slice(&plaintext).map_err(|e| VaultError::Malformed(ValidationError::from_json(&e)))
    }

    /// Seal raw bytes (the original upload). Not interchangeable with
    /// [`Vault::encrypt`] output.
    pub fn encrypt_bytes(&self, bytes: &[u8], document_id: &str) -> Result<Vec<u8>, CryptoError> {
        let key = self.derive_key(document_id);
        Ok(key.encrypt(PayloadKind::Source, bytes)?.to_bytes())
    }

    pub fn decrypt_bytes(&self, bytes: &[u8], document_id: &str) -> Result<Vec<u8>, CryptoError> {
        let encrypted = EncryptedData::from_bytes(bytes)?;
        self.derive_key(document_id)
            .decrypt(PayloadKind::Source, &encrypted)
    }

    // ── Storage ─────────────────────────────────────────────

    /// Path of the encrypted bundle for `document_id`.
    pub fn secure_file_path(&self, document_id: &str) -> PathBuf {
        self.path_for(document_id, PayloadKind::Bundle)
    }

    /// Path of the encrypted original upload for `document_id`.
    pub fn source_file_path(&self, document_id: &str) -> PathBuf {
        self.path_for(document_id, PayloadKind::Source)
    }

    fn path_for(&self, document_id: &str, kind: PayloadKind) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.{}", storage_stem(document_id), kind.suffix()))
    }

    pub fn exists(&self, document_id: &str) -> bool {
        self.secure_file_path(document_id).is_file()
    }

    /// Validate and persist a bundle under `bundle.id`.
    pub fn store_bundle(&self, bundle: &DocumentBundle) -> Result<PathBuf, VaultError> {
        bundle.validate()?;
        let sealed = self.encrypt(bundle, &bundle.id)?;
        let path = self.secure_file_path(&bundle.id);
        write_atomically(&path, &sealed)?;

        tracing::info!(
            stem = %storage_stem(&bundle.id),
            chunks = bundle.chunks.len(),
            tables = bundle.tables.len(),
            charts = bundle.charts.len(),
            "Document bundle stored"
        );
        Ok(path)
    }

    /// Load, decrypt and validate a bundle. The returned bundle carries
    /// `document_id` as its id.
    pub fn load_bundle(&self, document_id: &str) -> Result<DocumentBundle, VaultError> {
        let bytes = read_existing(&self.secure_file_path(document_id))?;
        let mut bundle: DocumentBundle = self.decrypt(&bytes, document_id).inspect_err(|e| {
            tracing::warn!(stem = %storage_stem(document_id), "Bundle could not be opened: {e}");
        })?;
        bundle.validate()?;
        bundle.id = document_id.to_string();

        tracing::debug!(stem = %storage_stem(document_id), "Document bundle loaded");
        Ok(bundle)
    }

    pub fn store_source(&self, document_id: &str, bytes: &[u8]) -> Result<PathBuf, VaultError> {
        let sealed = self.encrypt_bytes(bytes, document_id)?;
        let path = self.source_file_path(document_id);
        write_atomically(&path, &sealed)?;
        tracing::info!(stem = %storage_stem(document_id), size = bytes.len(), "Source file stored");
        Ok(path)
    }

    pub fn load_source(&self, document_id: &str) -> Result<Vec<u8>, VaultError> {
        let bytes = read_existing(&self.source_file_path(document_id))?;
        Ok(self.decrypt_bytes(&bytes, document_id)?)
    }

    /// Securely delete the bundle and source file. Missing files are fine.
    pub fn remove(&self, document_id: &str) -> Result<(), VaultError> {
        secure_delete_file(&self.secure_file_path(document_id))?;
        secure_delete_file(&self.source_file_path(document_id))?;
        tracing::info!(stem = %storage_stem(document_id), "Document removed from vault");
        Ok(())
    }
}

/// Hex SHA-256 of the document id. Used for file names and log fields so
/// the id itself never reaches disk or logs.
pub fn storage_stem(document_id: &str) -> String {
    format!("{:x}", Sha256::digest(document_id.as_bytes()))
}

fn read_existing(path: &Path) -> Result<Vec<u8>, VaultError> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(VaultError::MissingDocument),
        Err(e) => Err(VaultError::Io(e)),
    }
}

/// Write to a staging file, sync, then rename over the target.
fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension(PARTIAL_WRITE_EXTENSION);
    {
        let mut file = fs::File::create(&staging)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&staging, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, ChartRecord, TableRecord};

    fn test_vault(dir: &Path) -> Vault {
        Vault::new(VaultConfig::new(dir, "test-salt"))
    }

    fn sample_bundle(id: &str) -> DocumentBundle {
        DocumentBundle {
            id: id.to_string(),
            full_text: "--- Page 1 ---\nThe study ran for six weeks.".into(),
            chunks: vec![Chunk::from_sentences(
                vec!["The study ran for six weeks.".into()],
                1,
                1,
                29,
            )],
            tables: vec![TableRecord::from_extracted_rows(
                1,
                0,
                vec![
                    vec![Some("Week".into()), Some("Score".into())],
                    vec![Some("1".into()), Some("4.2".into())],
                ],
            )],
            charts: vec![ChartRecord::new(1, 0, [10.0, 10.0, 200.0, 150.0])],
            content_hash: "aGFzaA==".into(),
        }
    }

    #[test]
    fn bundle_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let bundle = sample_bundle("report-2024");

        vault.store_bundle(&bundle).unwrap();
        let loaded = vault.load_bundle("report-2024").unwrap();
        assert_eq!(loaded, bundle);
    }

    #[test]
    fn wrong_id_fails_authentication() {
        let vault = test_vault(Path::new("/unused"));
        let sealed = vault.encrypt(&sample_bundle("a"), "a").unwrap();
        let result: Result<DocumentBundle, _> = vault.decrypt(&sealed, "b");
        assert!(matches!(result, Err(VaultError::Crypto(CryptoError::Authentication))));
    }

    #[test]
    fn generic_payload_round_trip() {
        let vault = test_vault(Path::new("/unused"));
        let payload = vec!["alpha".to_string(), "beta".to_string()];
        let sealed = vault.encrypt(&payload, "doc").unwrap();
        let opened: Vec<String> = vault.decrypt(&sealed, "doc").unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn key_derivation_is_deterministic_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        test_vault(dir.path()).store_bundle(&sample_bundle("doc")).unwrap();
        let reopened = test_vault(dir.path());
        assert!(reopened.load_bundle("doc").is_ok());
    }

    #[test]
    fn different_salt_cannot_open() {
        let dir = tempfile::tempdir().unwrap();
        test_vault(dir.path()).store_bundle(&sample_bundle("doc")).unwrap();
        let other = Vault::new(VaultConfig::new(dir.path(), "other-salt"));
        assert!(matches!(
            other.load_bundle("doc"),
            Err(VaultError::Crypto(CryptoError::Authentication))
        ));
    }

    #[test]
    fn tampered_file_fails_authentication() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let path = vault.store_bundle(&sample_bundle("doc")).unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            vault.load_bundle("doc"),
            Err(VaultError::Crypto(CryptoError::Authentication))
        ));
    }

    #[test]
    fn truncated_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        fs::write(vault.secure_file_path("doc"), [0u8; 20]).unwrap();
        assert!(matches!(
            vault.load_bundle("doc"),
            Err(VaultError::Crypto(CryptoError::Malformed))
        ));
    }

    #[test]
    fn missing_document_is_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let err = vault.load_bundle("never-stored").unwrap_err();
        assert!(matches!(err, VaultError::MissingDocument));
        assert!(!err.to_string().contains("never-stored"));
    }

    #[test]
    fn invalid_bundle_is_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let mut bundle = sample_bundle("doc");
        bundle.chunks[0].page = 0;

        assert!(matches!(vault.store_bundle(&bundle), Err(VaultError::Malformed(_))));
        assert!(!vault.exists("doc"));
    }

    #[test]
    fn malformed_decrypted_content_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let mut bundle = sample_bundle("doc");
        bundle.tables[0].rows.push(vec!["short".into()]);
        // Bypass store-side validation to simulate a bad writer.
        let sealed = vault.encrypt(&bundle, "doc").unwrap();
        fs::write(vault.secure_file_path("doc"), sealed).unwrap();

        assert!(matches!(vault.load_bundle("doc"), Err(VaultError::Malformed(_))));
    }

    #[test]
    fn wrongly_typed_payload_is_malformed_without_leaking_text() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let payload = serde_json::json!({
            "pdf_text": "",
            "pdf_chunks": [{
                "text": "x",
                "page": "TOP SECRET PLAINTEXT",
                "start_char": 0,
                "end_char": 1,
                "sentences": ["x"]
            }],
            "file_hash": ""
        });
        let sealed = vault.encrypt(&payload, "doc").unwrap();
        fs::write(vault.secure_file_path("doc"), sealed).unwrap();

        let err = vault.load_bundle("doc").unwrap_err();
        assert!(matches!(err, VaultError::Malformed(ValidationError::Schema { .. })));
        assert!(!err.to_string().contains("TOP SECRET"));
        assert!(!format!("{err:?}").contains("TOP SECRET"));
        assert_eq!(err.user_message(), "Could not load document.");
    }

    #[test]
    fn unknown_payload_field_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let payload = serde_json::json!({
            "pdf_text": "", "pdf_chunks": [], "file_hash": "", "leaked": "chapter two"
        });
        let sealed = vault.encrypt(&payload, "doc").unwrap();
        fs::write(vault.secure_file_path("doc"), sealed).unwrap();

        let err = vault.load_bundle("doc").unwrap_err();
        assert!(matches!(err, VaultError::Malformed(_)));
        assert!(!err.to_string().contains("chapter two"));
    }

    #[test]
    fn storage_path_is_hashed_id() {
        let vault = test_vault(Path::new("/data"));
        let path = vault.secure_file_path("my-doc");
        let name = path.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + ".enc".len());
        assert!(name.ends_with(".enc"));
        assert!(!name.contains("my-doc"));
        assert_eq!(path.parent().unwrap(), Path::new("/data"));
    }

    #[test]
    fn storage_stem_matches_known_digest() {
        assert_eq!(
            storage_stem("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn source_round_trip_and_kind_separation() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        let pdf = b"%PDF-1.7 fake body".to_vec();

        vault.store_source("doc", &pdf).unwrap();
        assert_eq!(vault.load_source("doc").unwrap(), pdf);
        assert_ne!(vault.source_file_path("doc"), vault.secure_file_path("doc"));

        let sealed_source = fs::read(vault.source_file_path("doc")).unwrap();
        let as_bundle: Result<DocumentBundle, _> = vault.decrypt(&sealed_source, "doc");
        assert!(matches!(as_bundle, Err(VaultError::Crypto(CryptoError::Authentication))));
    }

    #[test]
    fn remove_deletes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let vault = test_vault(dir.path());
        vault.store_bundle(&sample_bundle("doc")).unwrap();
        vault.store_source("doc", b"raw").unwrap();
        assert!(vault.exists("doc"));

        vault.remove("doc").unwrap();
        assert!(!vault.exists("doc"));
        assert!(!vault.source_file_path("doc").exists());
        assert!(vault.remove("doc").is_ok());
    }

    #[test]
    fn open_creates_dir_and_clears_partial_writes() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("vault");
        fs::create_dir_all(&data).unwrap();
        fs::write(data.join("deadbeef.tmp"), b"partial").unwrap();

        let vault = Vault::open(VaultConfig::new(&data, "test-salt")).unwrap();
        assert!(vault.data_dir().is_dir());
        assert!(!data.join("deadbeef.tmp").exists());
    }

    #[test]
    fn concurrent_derivation_across_documents() {
        let vault = std::sync::Arc::new(test_vault(Path::new("/unused")));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let vault = vault.clone();
                std::thread::spawn(move || {
                    let id = format!("doc-{i}");
                    let sealed = vault.encrypt(&id, &id).unwrap();
                    let opened: String = vault.decrypt(&sealed, &id).unwrap();
                    assert_eq!(opened, id);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
