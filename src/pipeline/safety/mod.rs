pub mod types;
pub mod patterns;
pub mod guardrail;
pub mod probing;
pub mod output_sanitize;

pub use guardrail::Guardrail;
pub use output_sanitize::sanitize;
pub use probing::ProbingDetector;
pub use types::*;
