//! Error types for the LLM adapters.

/// Errors that can occur in the runner.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// An LLM backend call failed.
    #[error("llm backend error: {0}")]
    LlmBackend(String),

    /// The backend rejected our credentials or does not exist; retrying
    /// is pointless.
    #[error("llm backend unusable: {0}")]
    Unusable(String),

    /// A template failed to load or render.
    #[error("template error: {0}")]
    Template(String),

    /// The model's output could not be parsed into actions.
    #[error("parse error: {0}")]
    Parse(String),
}
