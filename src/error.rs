//! Crate-level error types for quiz chain runs
//!
//! Collaborator boundaries (page fetch, solvers, submission) own narrower error
//! enums. `QuizError` aggregates the ones that can end a chain run and maps each
//! to a [`Termination`] so callers can tell a stall from a ceiling or a fetch
//! failure without string matching.

use crate::chain::Termination;
use crate::config::ConfigError;
use crate::fetch::FetchError;
use crate::llm::provider::LlmError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for quiz chain operations
#[derive(Debug, Error)]
pub enum QuizError {
    #[error("Access denied: {message}")]
    AccessDenied { message: String },

    #[error("Failed to fetch page {url}: {source}")]
    PageFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("Chain stalled at {url}: {reason}")]
    ChainStalled { url: String, reason: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Attempt ceiling reached: {attempts} attempts without completing the chain")]
    AttemptCeilingReached { attempts: u32 },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl QuizError {
    /// Create access denied error
    pub fn access_denied<S: Into<String>>(message: S) -> Self {
        Self::AccessDenied {
            message: message.into(),
        }
    }

    /// Create page fetch error for the given URL
    pub fn page_fetch<S: Into<String>>(url: S, source: FetchError) -> Self {
        Self::PageFetch {
            url: url.into(),
            source,
        }
    }

    /// Create chain stalled error
    pub fn chain_stalled<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::ChainStalled {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create attempt ceiling error
    pub fn attempt_ceiling(attempts: u32) -> Self {
        Self::AttemptCeilingReached { attempts }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// How a chain run ended when it ended with this error
    pub fn termination(&self) -> Termination {
        match self {
            QuizError::AccessDenied { .. } => Termination::AccessDenied,
            QuizError::PageFetch { .. } => Termination::FetchFailed,
            QuizError::ChainStalled { .. } => Termination::Stalled,
            QuizError::InvalidInput { .. } => Termination::InvalidInput,
            QuizError::AttemptCeilingReached { .. } => Termination::AttemptCeiling,
            QuizError::Config(_) | QuizError::Llm(_) | QuizError::Internal { .. } => {
                Termination::Internal
            }
        }
    }

    /// Message safe to hand back to the caller of a chain run
    pub fn public_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("valid secret pattern")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("valid path pattern")
});

const MAX_MESSAGE_LEN: usize = 500;

/// Redact credential-looking values and truncate to 500 bytes
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN
        .replace_all(message, "${1}=***")
        .to_string();

    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for quiz chain operations
pub type QuizResult<T> = Result<T, QuizError>;
