use super::patterns::is_sequential_request;

/// How many recent questions the detector looks at.
pub const PROBING_WINDOW: usize = 3;
pub const PROBING_THRESHOLD: f64 = 0.7;

/// Flags a session whose recent questions mostly read like "keep going".
///
/// Advisory only: a positive result is logged and reported with the answer
/// but never refuses a question by itself.
#[derive(Debug, Clone, Copy)]
pub struct ProbingDetector {
    window: usize,
    threshold: f64,
}

impl Default for ProbingDetector {
    fn default() -> Self {
        Self {
            window: PROBING_WINDOW,
            threshold: PROBING_THRESHOLD,
        }
    }
}

impl ProbingDetector {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self {
            window: window.max(1),
            threshold,
        }
    }

    /// Share of the last `window` questions that are sequential requests.
    pub fn sequential_share<S: AsRef<str>>(&self, questions: &[S]) -> f64 {
        let recent = &questions[questions.len().saturating_sub(self.window)..];
        if recent.is_empty() {
            return 0.0;
        }
        let hits = recent
            .iter()
            .filter(|q| is_sequential_request(q.as_ref()))
            .count();
        hits as f64 / recent.len() as f64
    }

    pub fn is_probing<S: AsRef<str>>(&self, questions: &[S]) -> bool {
        !questions.is_empty() && self.sequential_share(questions) >= self.threshold
    }
}
