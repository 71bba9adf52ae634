use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use super::encryption::{EncryptedData, PayloadKind};
use super::CryptoError;

pub const KEY_LENGTH: usize = 32; // AES-256

/// Per-document encryption key. Zeroed on drop, never persisted.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct DocumentKey {
    pub(super) key_bytes: [u8; KEY_LENGTH],
}

impl DocumentKey {
    /// Derive from document id + deployment salt using PBKDF2-SHA256.
    ///
    /// Deterministic: the same `(document_id, salt, iterations)` always yields
    /// the same key, so a document can be reopened from its id alone.
    pub fn derive(document_id: &str, salt: &[u8], iterations: u32) -> Self {
        let mut key_bytes = [0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(document_id.as_bytes(), salt, iterations, &mut key_bytes);
        Self { key_bytes }
    }

    /// Encrypt data using AES-256-GCM, bound to the payload kind.
    pub fn encrypt(&self, kind: PayloadKind, plaintext: &[u8]) -> Result<EncryptedData, CryptoError> {
        EncryptedData::encrypt(&self.key_bytes, kind, plaintext)
    }

    /// Decrypt data using AES-256-GCM. Fails if the kind differs from the one
    /// used at encryption time.
    pub fn decrypt(&self, kind: PayloadKind, encrypted: &EncryptedData) -> Result<Vec<u8>, CryptoError> {
        encrypted.decrypt(&self.key_bytes, kind)
    }
}

impl std::fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DocumentKey(..)")
    }
}
