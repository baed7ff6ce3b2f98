//! LLM adapters for the Hearth engine.
//!
//! The engine only knows the [`hearth_core::Reasoner`] and
//! [`hearth_core::Narrator`] traits; this crate provides the HTTP-backed
//! implementations. [`LlmReasoner`] keeps one transcript per agent
//! session and speaks to an Anthropic- or OpenAI-compatible endpoint;
//! [`LlmNarrator`] renders structured action results to prose, keeping a
//! local template for simple successes and deferring crafting,
//! perception, and failure results to the model.
//!
//! # Modules
//!
//! - [`llm`] -- shared HTTP transport with per-endpoint wire dialects
//! - [`prompt`] -- minijinja templates (built-ins, overridable from disk)
//! - [`parse`] -- tolerant parsing of model output into actions
//! - [`reasoner`] -- the [`LlmReasoner`]
//! - [`narrator`] -- the [`LlmNarrator`]

pub mod error;
pub mod llm;
pub mod narrator;
pub mod parse;
pub mod prompt;
pub mod reasoner;

pub use error::RunnerError;
pub use llm::{Dialect, LlmBackend, LlmBackendConfig};
pub use narrator::LlmNarrator;
pub use prompt::{PromptEngine, RenderedPrompt};
pub use reasoner::LlmReasoner;
