use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Application-level constants
pub const APP_NAME: &str = "DocShield";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Salt used when `ENCRYPTION_SALT` is unset. Weak: every deployment that
/// forgets to set the variable shares it.
pub const DEFAULT_ENCRYPTION_SALT: &str = "docshield-default-salt";

pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MAX_QUOTE_LEN: usize = 150;
pub const DEFAULT_MAX_CONSECUTIVE_QUOTES: u32 = 3;
pub const DEFAULT_CONTEXT_TOKENS: usize = 1000;

/// PBKDF2 floor. Configured values below this are raised to it.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "docshield=info,warn"
}

/// Get the application data directory.
/// ~/DocShield/ when a home directory exists, the working directory otherwise.
pub fn app_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(APP_NAME),
        None => PathBuf::from("."),
    }
}

/// Directory holding encrypted document bundles.
/// `DOCSHIELD_DATA_DIR` overrides the default.
pub fn data_dir() -> PathBuf {
    env_opt("DOCSHIELD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| app_data_dir().join("data"))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env_opt(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(key, "Unparseable configuration value, using default");
                default
            }
        },
        None => default,
    }
}

// ═══════════════════════════════════════════════════════════
// Protection pipeline
// ═══════════════════════════════════════════════════════════

/// Tunables for chunking, retrieval, the guardrail and answer sanitizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub max_quote_len: usize,
    /// Overlapping-request streak that triggers a repetition refusal.
    pub max_consecutive_quotes: u32,
    /// Approximate token budget for the context handed to the generator.
    pub max_context_tokens: usize,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            max_quote_len: DEFAULT_MAX_QUOTE_LEN,
            max_consecutive_quotes: DEFAULT_MAX_CONSECUTIVE_QUOTES,
            max_context_tokens: DEFAULT_CONTEXT_TOKENS,
        }
    }
}

impl ProtectionConfig {
    /// Read overrides from `DOCSHIELD_*` environment variables.
    /// Unparseable values fall back to their default; the combined result
    /// must still pass [`ProtectionConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_chunk_size: env_parse("DOCSHIELD_MAX_CHUNK_SIZE", defaults.max_chunk_size),
            chunk_overlap: env_parse("DOCSHIELD_CHUNK_OVERLAP", defaults.chunk_overlap),
            top_k: env_parse("DOCSHIELD_TOP_K", defaults.top_k),
            max_quote_len: env_parse("DOCSHIELD_MAX_QUOTE_LEN", defaults.max_quote_len),
            max_consecutive_quotes: env_parse(
                "DOCSHIELD_MAX_CONSECUTIVE_QUOTES",
                defaults.max_consecutive_quotes,
            ),
            max_context_tokens: env_parse(
                "DOCSHIELD_MAX_CONTEXT_TOKENS",
                defaults.max_context_tokens,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.max_chunk_size {
            return Err(ConfigError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                max_chunk_size: self.max_chunk_size,
            });
        }
        // Room for at least one character plus the "..." marker.
        if self.max_quote_len < 4 {
            return Err(ConfigError::QuoteLimitTooSmall(self.max_quote_len));
        }
        if self.max_consecutive_quotes == 0 {
            return Err(ConfigError::ZeroQuoteStreak);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_chunk_size must be greater than zero")]
    ZeroChunkSize,
    #[error("chunk_overlap ({overlap}) must be smaller than max_chunk_size ({max_chunk_size})")]
    OverlapTooLarge { overlap: usize, max_chunk_size: usize },
    #[error("max_quote_len must be at least 4, got {0}")]
    QuoteLimitTooSmall(usize),
    #[error("max_consecutive_quotes must be at least 1")]
    ZeroQuoteStreak,
}

// ═══════════════════════════════════════════════════════════
// Vault
// ═══════════════════════════════════════════════════════════

/// Key-derivation and storage settings for the document vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    pub data_dir: PathBuf,
    pub salt: String,
    pub kdf_iterations: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: app_data_dir().join("data"),
            salt: DEFAULT_ENCRYPTION_SALT.to_string(),
            kdf_iterations: MIN_KDF_ITERATIONS,
        }
    }
}

impl VaultConfig {
    /// Build from `DOCSHIELD_DATA_DIR`, `ENCRYPTION_SALT` and
    /// `DOCSHIELD_KDF_ITERATIONS`.
    pub fn from_env() -> Self {
        let salt = match env_opt("ENCRYPTION_SALT") {
            Some(salt) => salt,
            None => {
                tracing::warn!("ENCRYPTION_SALT is not set; using the built-in default salt");
                DEFAULT_ENCRYPTION_SALT.to_string()
            }
        };

        Self {
            data_dir: data_dir(),
            salt,
            kdf_iterations: env_parse("DOCSHIELD_KDF_ITERATIONS", MIN_KDF_ITERATIONS),
        }
        .normalized()
    }

    /// Vault rooted at `data_dir` with the given salt.
    pub fn new(data_dir: impl Into<PathBuf>, salt: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            salt: salt.to_string(),
            kdf_iterations: MIN_KDF_ITERATIONS,
        }
    }

    /// Raise the iteration count to the PBKDF2 floor.
    pub fn normalized(mut self) -> Self {
        if self.kdf_iterations < MIN_KDF_ITERATIONS {
            tracing::warn!(
                configured = self.kdf_iterations,
                floor = MIN_KDF_ITERATIONS,
                "KDF iterations below floor, raising"
            );
            self.kdf_iterations = MIN_KDF_ITERATIONS;
        }
        self
    }
}
