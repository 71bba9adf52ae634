pub mod config;
pub mod models;
pub mod crypto;
pub mod pipeline;
pub mod session;

use tracing_subscriber::EnvFilter;

pub use config::{ConfigError, ProtectionConfig, VaultConfig};
pub use crypto::{Vault, VaultError};
pub use models::{Chunk, ChartRecord, DocumentBundle, TableRecord};
pub use pipeline::ingest::{ingest_and_store, ingest_document, DocumentInput};
pub use pipeline::rag::{AnswerGenerator, QaOutcome, RagError, SecureQa};
pub use session::{QaSession, SessionRegistry, SharedSession};

/// Install the global fmt subscriber. `RUST_LOG` wins over the default filter.
///
/// Call once at startup; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
