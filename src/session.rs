//! Protected Q&A sessions.
//!
//! Each session owns the guardrail state and transcript for one reader
//! working through one document. Sessions are handed out as
//! `Arc<Mutex<QaSession>>` so questions of the same session are evaluated
//! one at a time, while different sessions never share throttling state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Exchange, ExchangeOutcome, ExchangeRole};
use crate::pipeline::safety::GuardrailState;

// ═══════════════════════════════════════════════════════════
// QaSession: one reader, one document
// ═══════════════════════════════════════════════════════════

pub struct QaSession {
    id: Uuid,
    document_id: String,
    created_at: DateTime<Utc>,
    guard: GuardrailState,
    transcript: Vec<Exchange>,
}

impl QaSession {
    pub fn new(document_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document_id.to_string(),
            created_at: Utc::now(),
            guard: GuardrailState::new(),
            transcript: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn guard(&self) -> &GuardrailState {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut GuardrailState {
        &mut self.guard
    }

    pub fn transcript(&self) -> &[Exchange] {
        &self.transcript
    }

    pub fn push(&mut self, exchange: Exchange) {
        self.transcript.push(exchange);
    }

    /// The last `n` reader questions, oldest first.
    pub fn recent_questions(&self, n: usize) -> Vec<&str> {
        let mut questions: Vec<&str> = self
            .transcript
            .iter()
            .rev()
            .filter(|e| e.role == ExchangeRole::Reader)
            .take(n)
            .map(|e| e.content.as_str())
            .collect();
        questions.reverse();
        questions
    }

    /// Most recent question that got a real answer, with that answer.
    pub fn last_answered(&self) -> Option<(&str, &str)> {
        self.transcript.windows(2).rev().find_map(|pair| {
            let (question, reply) = (&pair[0], &pair[1]);
            let answered = question.role == ExchangeRole::Reader
                && reply.outcome == Some(ExchangeOutcome::Answered);
            answered.then(|| (question.content.as_str(), reply.content.as_str()))
        })
    }
}

// ═══════════════════════════════════════════════════════════
// SessionRegistry: all open sessions
// ═══════════════════════════════════════════════════════════

pub type SharedSession = Arc<Mutex<QaSession>>;

/// Open sessions keyed by session id. Safe to share across threads.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `document_id`.
    pub fn open(&self, document_id: &str) -> Result<(Uuid, SharedSession), SessionError> {
        let session = QaSession::new(document_id);
        let id = session.id();
        let shared = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned)?
            .insert(id, shared.clone());

        tracing::info!(session = %id, "Q&A session opened");
        Ok((id, shared))
    }

    pub fn get(&self, id: &Uuid) -> Result<SharedSession, SessionError> {
        self.sessions
            .read()
            .map_err(|_| SessionError::LockPoisoned)?
            .get(id)
            .cloned()
            .ok_or(SessionError::NotFound(*id))
    }

    /// Drop a session. Returns false if it was not open.
    pub fn close(&self, id: &Uuid) -> Result<bool, SessionError> {
        let removed = self
            .sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned)?
            .remove(id)
            .is_some();
        if removed {
            tracing::info!(session = %id, "Q&A session closed");
        }
        Ok(removed)
    }

    /// Drop every session.
    pub fn clear(&self) -> Result<(), SessionError> {
        self.sessions
            .write()
            .map_err(|_| SessionError::LockPoisoned)?
            .clear();
        Ok(())
    }

    pub fn session_ids(&self) -> Vec<Uuid> {
        self.sessions
            .read()
            .map(|s| s.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} is not open")]
    NotFound(Uuid),
    #[error("Session registry lock poisoned")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
