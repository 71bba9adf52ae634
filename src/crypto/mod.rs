pub mod keys;
pub mod encryption;
pub mod secure_delete;
pub mod vault;

pub use keys::*;
pub use encryption::*;
pub use vault::*;

use thiserror::Error;

use crate::models::ValidationError;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: wrong document or tampered data")]
    Authentication,

    #[error("Encrypted data is malformed")]
    Malformed,

    /// Display never includes the serde message, which may quote payload
    /// content.
    #[error("Payload serialization failed")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced by the document vault. Messages never carry the document
/// id, key material or ciphertext.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Document not found")]
    MissingDocument,

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Stored document is malformed: {0}")]
    Malformed(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Message safe to show the person asking for the document.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingDocument => "Document not found.",
            Self::Crypto(_) | Self::Malformed(_) => "Could not load document.",
            Self::Io(_) => "Could not access document storage.",
        }
    }
}
