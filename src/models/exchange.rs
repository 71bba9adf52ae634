use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ExchangeOutcome, ExchangeRole};

/// One line of a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub role: ExchangeRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Set on assistant lines only.
    pub outcome: Option<ExchangeOutcome>,
}

impl Exchange {
    pub fn reader(content: &str) -> Self {
        Self {
            role: ExchangeRole::Reader,
            content: content.to_string(),
            timestamp: Utc::now(),
            outcome: None,
        }
    }

    pub fn assistant(content: &str, outcome: ExchangeOutcome) -> Self {
        Self {
            role: ExchangeRole::Assistant,
            content: content.to_string(),
            timestamp: Utc::now(),
            outcome: Some(outcome),
        }
    }

    pub fn is_reader(&self) -> bool {
        self.role == ExchangeRole::Reader
    }
}
