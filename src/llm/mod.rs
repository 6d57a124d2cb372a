//! LLM provider abstraction layer
//!
//! Provider-agnostic traits for chat completion and transcription, plus the
//! OpenAI-compatible implementation the solvers use by default.

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
