use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::context::{assemble_context, truncate_to_tokens};
use super::navigation::suggest_questions;
use super::prompt::{build_question_prompt, no_context_response, qa_system_prompt, SUMMARY_SYSTEM_PROMPT};
use super::RagError;
use crate::config::ProtectionConfig;
use crate::models::{Chunk, Exchange, ExchangeOutcome};
use crate::pipeline::safety::probing::PROBING_WINDOW;
use crate::pipeline::safety::{
    sanitize, GuardAction, GuardDecision, Guardrail, GuardrailState, ProbingDetector, RefusalReason,
};
use crate::session::QaSession;

/// External text generation. Implementations own transport, retries and
/// timeouts; a timeout should surface as [`RagError::Timeout`].
pub trait AnswerGenerator {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError>;
}

/// What the reader gets back for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaOutcome {
    pub answer: String,
    pub action: GuardAction,
    pub refusal_reason: Option<RefusalReason>,
    /// Pages the answer drew on.
    pub pages: Vec<u32>,
    /// Recent questions look like a walk through the document.
    pub probing_flagged: bool,
}

impl QaOutcome {
    fn refused(reason: RefusalReason, probing_flagged: bool) -> Self {
        Self {
            answer: reason.message().to_string(),
            action: GuardAction::Refuse,
            refusal_reason: Some(reason),
            pages: Vec::new(),
            probing_flagged,
        }
    }

    fn answered(answer: String, pages: Vec<u32>, probing_flagged: bool) -> Self {
        Self {
            answer,
            action: GuardAction::Answer,
            refusal_reason: None,
            pages,
            probing_flagged,
        }
    }
}

/// Protected question answering over one document's chunks.
///
/// Coordinates: guardrail → context budget → generate → quote sanitize.
pub struct SecureQa<'a, G: AnswerGenerator + ?Sized> {
    generator: &'a G,
    config: ProtectionConfig,
    system_prompt: String,
    guardrail: Guardrail,
    probing: ProbingDetector,
}

impl<'a, G: AnswerGenerator + ?Sized> SecureQa<'a, G> {
    pub fn new(generator: &'a G, config: ProtectionConfig) -> Self {
        Self {
            generator,
            guardrail: Guardrail::from_config(&config),
            probing: ProbingDetector::default(),
            system_prompt: qa_system_prompt(config.max_quote_len),
            config,
        }
    }

    /// Answer within a shared session.
    ///
    /// The session lock is held while the guardrail reads and updates its
    /// state, and released before the generator is called, so concurrent
    /// questions of one session are throttled as if they arrived in order.
    /// A generation failure is recorded in the transcript but leaves the
    /// guardrail state as `evaluate` left it.
    pub fn ask(&self, session: &Mutex<QaSession>, question: &str, chunks: &[Chunk]) -> Result<QaOutcome, RagError> {
        let (decision, probing_flagged) = {
            let mut session = session.lock().map_err(|_| RagError::SessionUnavailable)?;
            session.push(Exchange::reader(question));

            let probing_flagged = self.probing.is_probing(&session.recent_questions(PROBING_WINDOW));
            if probing_flagged {
                tracing::warn!(session = %session.id(), "Sequential probing pattern in recent questions");
            }

            let decision = self.guardrail.evaluate(session.guard_mut(), question, chunks);
            if let Some(reason) = decision.refusal_reason {
                session.push(Exchange::assistant(reason.message(), ExchangeOutcome::Refused));
                return Ok(QaOutcome::refused(reason, probing_flagged));
            }
            (decision, probing_flagged)
        };

        match self.generate_answer(question, &decision) {
            Ok(outcome) => {
                let outcome = QaOutcome {
                    probing_flagged,
                    ..outcome
                };
                let mut session = session.lock().map_err(|_| RagError::SessionUnavailable)?;
                session.push(Exchange::assistant(&outcome.answer, ExchangeOutcome::Answered));
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("Answer generation failed: {e}");
                if let Ok(mut session) = session.lock() {
                    session.push(Exchange::assistant(e.user_message(), ExchangeOutcome::Failed));
                }
                Err(e)
            }
        }
    }

    /// Answer against caller-owned guardrail state. The caller serializes
    /// access to `state`.
    pub fn answer(&self, state: &mut GuardrailState, question: &str, chunks: &[Chunk]) -> Result<QaOutcome, RagError> {
        let decision = self.guardrail.evaluate(state, question, chunks);
        if let Some(reason) = decision.refusal_reason {
            return Ok(QaOutcome::refused(reason, false));
        }
        self.generate_answer(question, &decision)
    }

    fn generate_answer(&self, question: &str, decision: &GuardDecision) -> Result<QaOutcome, RagError> {
        if decision.context_chunks.is_empty() {
            return Ok(QaOutcome::answered(no_context_response(), Vec::new(), false));
        }

        let context = assemble_context(&decision.context_chunks, self.config.max_context_tokens);
        let prompt = build_question_prompt(question, &context.text);
        let raw = self.generator.generate(&self.system_prompt, &prompt)?;
        let answer = sanitize(&raw, self.config.max_quote_len);

        tracing::info!(
            context_tokens = context.estimated_tokens,
            pages = ?context.pages,
            "Question answered"
        );
        Ok(QaOutcome::answered(answer, context.pages, false))
    }

    /// Abstract, non-reconstructive summary of `text`.
    pub fn summarize(&self, text: &str) -> Result<String, RagError> {
        let input = truncate_to_tokens(text, self.config.max_context_tokens);
        let raw = self.generator.generate(SUMMARY_SYSTEM_PROMPT, &input)?;
        Ok(sanitize(&raw, self.config.max_quote_len))
    }

    /// Follow-up questions for the session, seeded by its last exchange.
    pub fn suggest_questions(&self, session: &Mutex<QaSession>, chunks: &[Chunk]) -> Result<Vec<String>, RagError> {
        let previous = {
            let session = session.lock().map_err(|_| RagError::SessionUnavailable)?;
            session
                .last_answered()
                .map(|(q, a)| (q.to_string(), a.to_string()))
        };
        Ok(suggest_questions(
            self.generator,
            chunks,
            previous.as_ref().map(|(q, a)| (q.as_str(), a.as_str())),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExchangeRole;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Echoes a fixed reply and counts calls.
    struct MockLlm {
        response: String,
        calls: AtomicUsize,
    }

    impl MockLlm {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AnswerGenerator for MockLlm {
        fn generate(&self, _system: &str, _prompt: &str) -> Result<String, RagError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    /// Returns the prompt it was given, so tests can inspect it.
    struct PromptEcho;

    impl AnswerGenerator for PromptEcho {
        fn generate(&self, system: &str, prompt: &str) -> Result<String, RagError> {
            Ok(format!("{system}\n---\n{prompt}"))
        }
    }

    struct TimingOut;

    impl AnswerGenerator for TimingOut {
        fn generate(&self, _system: &str, _prompt: &str) -> Result<String, RagError> {
            Err(RagError::Timeout)
        }
    }

    fn chunk(text: &str, page: u32) -> Chunk {
        Chunk::from_sentences(vec![text.to_string()], page, 0, text.len())
    }

    fn corpus() -> Vec<Chunk> {
        vec![
            chunk("The survey covered 400 households in three districts.", 1),
            chunk("Rainfall data came from regional weather stations.", 2),
            chunk("Results show yields rose by twelve percent.", 3),
        ]
    }

    fn session() -> Mutex<QaSession> {
        Mutex::new(QaSession::new("doc-1"))
    }

    #[test]
    fn answers_with_sanitized_text() {
        let long_quote = format!("The text says \"{}\".", "y".repeat(400));
        let llm = MockLlm::new(&long_quote);
        let qa = SecureQa::new(&llm, ProtectionConfig::default());

        let outcome = qa.ask(&session(), "What did the rainfall data show?", &corpus()).unwrap();
        assert_eq!(outcome.action, GuardAction::Answer);
        assert_eq!(outcome.answer, format!("The text says \"{}...\".", "y".repeat(147)));
        assert!(outcome.pages.contains(&2));
    }

    #[test]
    fn prompt_carries_question_and_context() {
        let qa = SecureQa::new(&PromptEcho, ProtectionConfig::default());
        let outcome = qa.ask(&session(), "rainfall stations", &corpus()).unwrap();
        assert!(outcome.answer.starts_with(&qa_system_prompt(150)));
        assert!(outcome.answer.contains("Question: rainfall stations\n\nContext from the document:\n"));
        assert!(outcome.answer.contains("Rainfall data came from regional weather stations."));
        assert!(!outcome.answer.contains("Results show yields"));
    }

    #[test]
    fn system_prompt_uses_configured_quote_limit() {
        let config = ProtectionConfig {
            max_quote_len: 60,
            ..ProtectionConfig::default()
        };
        let qa = SecureQa::new(&PromptEcho, config);
        let outcome = qa.ask(&session(), "rainfall stations", &corpus()).unwrap();
        assert!(outcome.answer.contains("under 60 characters"));
    }

    #[test]
    fn extraction_request_never_reaches_generator() {
        let llm = MockLlm::new("should not be used");
        let qa = SecureQa::new(&llm, ProtectionConfig::default());
        let session = session();

        let outcome = qa.ask(&session, "extract the entire document", &corpus()).unwrap();
        assert_eq!(outcome.action, GuardAction::Refuse);
        assert_eq!(outcome.answer, RefusalReason::ExtractionPattern.message());
        assert_eq!(llm.calls(), 0);

        let guard = session.lock().unwrap();
        assert_eq!(guard.transcript().len(), 2);
        assert_eq!(guard.transcript()[1].outcome, Some(ExchangeOutcome::Refused));
    }

    #[test]
    fn repeated_questions_eventually_refused() {
        let llm = MockLlm::new("An answer.");
        let qa = SecureQa::new(&llm, ProtectionConfig::default());
        let session = session();

        let actions: Vec<GuardAction> = (0..5)
            .map(|_| qa.ask(&session, "rainfall stations", &corpus()).unwrap().action)
            .collect();
        assert_eq!(actions[4], GuardAction::Refuse);
        assert!(actions[..4].iter().all(|a| *a == GuardAction::Answer));
        assert_eq!(llm.calls(), 4);
    }

    #[test]
    fn generation_failure_surfaces_and_keeps_state() {
        let qa = SecureQa::new(&TimingOut, ProtectionConfig::default());
        let session = session();

        let err = qa.ask(&session, "rainfall stations", &corpus()).unwrap_err();
        assert!(matches!(err, RagError::Timeout));

        let guard = session.lock().unwrap();
        // evaluate ran once: context recorded, no streak.
        assert_eq!(guard.guard().consecutive_quote_requests, 0);
        assert_eq!(guard.guard().previous_chunk_texts.len(), 1);
        let last = guard.transcript().last().unwrap();
        assert_eq!(last.outcome, Some(ExchangeOutcome::Failed));
        assert_eq!(last.content, RagError::Timeout.user_message());
    }

    #[test]
    fn probing_is_flagged_but_answered() {
        let llm = MockLlm::new("Sure.");
        let qa = SecureQa::new(&llm, ProtectionConfig::default());
        let session = session();

        qa.ask(&session, "what follows the survey?", &corpus()).unwrap();
        qa.ask(&session, "go on", &corpus()).unwrap();
        let outcome = qa.ask(&session, "then what?", &corpus()).unwrap();
        assert!(outcome.probing_flagged);
        assert_eq!(outcome.action, GuardAction::Answer);
    }

    #[test]
    fn empty_document_gets_no_context_reply() {
        let llm = MockLlm::new("unused");
        let qa = SecureQa::new(&llm, ProtectionConfig::default());
        let outcome = qa.ask(&session(), "Anything?", &[]).unwrap();
        assert_eq!(outcome.answer, no_context_response());
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn answer_with_caller_owned_state() {
        let llm = MockLlm::new("ok");
        let qa = SecureQa::new(&llm, ProtectionConfig::default());
        let mut state = GuardrailState::new();
        let outcome = qa.answer(&mut state, "rainfall", &corpus()).unwrap();
        assert_eq!(outcome.answer, "ok");
        assert!(!state.previous_chunk_texts.is_empty());
    }

    #[test]
    fn summary_is_sanitized_and_budgeted() {
        let llm = MockLlm::new(&format!("It argues \"{}\"", "q".repeat(300)));
        let config = ProtectionConfig {
            max_context_tokens: 10,
            ..ProtectionConfig::default()
        };
        let qa = SecureQa::new(&llm, config);
        let summary = qa.summarize(&"long text ".repeat(100)).unwrap();
        assert!(summary.ends_with("...\""));

        let echo = SecureQa::new(&PromptEcho, ProtectionConfig { max_context_tokens: 10, ..ProtectionConfig::default() });
        let sent = echo.summarize(&"abcd".repeat(100)).unwrap();
        let prompt = sent.split("\n---\n").nth(1).unwrap();
        assert_eq!(prompt.len(), 40 + 3);
    }

    #[test]
    fn suggestions_use_last_answered_exchange() {
        let qa = SecureQa::new(&PromptEcho, ProtectionConfig::default());
        let session = session();
        qa.ask(&session, "rainfall stations", &corpus()).unwrap();
        // PromptEcho output is not JSON, so the fallback list comes back.
        let suggestions = qa.suggest_questions(&session, &corpus()).unwrap();
        assert_eq!(suggestions.len(), 6);
    }

    #[test]
    fn concurrent_asks_respect_threshold() {
        let llm = Arc::new(MockLlm::new("An answer."));
        let session = Arc::new(session());
        let chunks = Arc::new(corpus());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let llm = llm.clone();
                let session = session.clone();
                let chunks = chunks.clone();
                std::thread::spawn(move || {
                    let qa = SecureQa::new(llm.as_ref(), ProtectionConfig::default());
                    qa.ask(&session, "rainfall stations", &chunks).unwrap().action
                })
            })
            .collect();

        let refusals = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|a| *a == GuardAction::Refuse)
            .count();
        // Serialized evaluation of 8 identical questions: answers 1-4, refuse 5,
        // answer 6-8 (streak restarts at 0 then climbs to 3).
        assert_eq!(refusals, 1);

        let guard = session.lock().unwrap();
        let readers = guard.transcript().iter().filter(|e| e.role == ExchangeRole::Reader).count();
        assert_eq!(readers, 8);
    }
}
