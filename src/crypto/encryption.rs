use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use serde::{Deserialize, Serialize};

use super::keys::KEY_LENGTH;
use super::CryptoError;

const NONCE_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// What an encrypted blob holds. Bound into the AES-GCM associated data so a
/// bundle never decrypts as a source file and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Bundle,
    Source,
}

impl PayloadKind {
    fn associated_data(self) -> &'static [u8] {
        match self {
            Self::Bundle => b"docshield:bundle:v1",
            Self::Source => b"docshield:source:v1",
        }
    }

    /// Storage file suffix.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Bundle => "enc",
            Self::Source => "source.enc",
        }
    }
}

/// One sealed payload. The ciphertext carries the 16-byte GCM tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_LENGTH],
    pub ciphertext: Vec<u8>,
}

fn cipher(key_bytes: &[u8; KEY_LENGTH]) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes))
}

impl EncryptedData {
    /// Seal `plaintext` under a fresh random nonce.
    pub(crate) fn encrypt(
        key_bytes: &[u8; KEY_LENGTH],
        kind: PayloadKind,
        plaintext: &[u8],
    ) -> Result<Self, CryptoError> {
        let mut nonce = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce);

        let payload = Payload {
            msg: plaintext,
            aad: kind.associated_data(),
        };
        let ciphertext = cipher(key_bytes)
            .encrypt(Nonce::from_slice(&nonce), payload)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok(Self { nonce, ciphertext })
    }

    /// Open the payload. Any mismatch of key, kind or bytes is an
    /// authentication failure.
    pub(crate) fn decrypt(&self, key_bytes: &[u8; KEY_LENGTH], kind: PayloadKind) -> Result<Vec<u8>, CryptoError> {
        let payload = Payload {
            msg: self.ciphertext.as_slice(),
            aad: kind.associated_data(),
        };
        cipher(key_bytes)
            .decrypt(Nonce::from_slice(&self.nonce), payload)
            .map_err(|_| CryptoError::Authentication)
    }

    /// On-disk layout: `nonce ‖ ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        [self.nonce.as_slice(), self.ciphertext.as_slice()].concat()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(CryptoError::Malformed);
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LENGTH);
        let nonce: [u8; NONCE_LENGTH] = nonce.try_into().map_err(|_| CryptoError::Malformed)?;

        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}
