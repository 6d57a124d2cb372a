//! Values that flow through one iteration of a chain run
//!
//! Everything here is created, consumed and dropped inside a single loop
//! iteration. Nothing is shared between concurrent runs.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Who is answering; checked at the entry point and echoed in every submission
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitterIdentity {
    pub email: String,
    pub secret: String,
}

impl SubmitterIdentity {
    pub fn new<E: Into<String>, S: Into<String>>(email: E, secret: S) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for SubmitterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitterIdentity")
            .field("email", &self.email)
            .field("secret", &"***")
            .finish()
    }
}

/// One loop iteration's position in the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizStep {
    pub url: String,
    /// 1-based, strictly increasing within a run
    pub attempt_index: u32,
}

/// A rendered quiz page
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSnapshot {
    pub raw_markup: String,
    pub question_text: String,
}

impl PageSnapshot {
    pub fn new<M: Into<String>, Q: Into<String>>(raw_markup: M, question_text: Q) -> Self {
        Self {
            raw_markup: raw_markup.into(),
            question_text: question_text.into(),
        }
    }

    /// First `max_chars` characters of the question, for log lines
    pub fn question_preview(&self, max_chars: usize) -> String {
        self.question_text.chars().take(max_chars).collect()
    }
}

/// Input to exactly one solver invocation
///
/// Solvers only ever see `&SolveRequest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveRequest {
    pub question_text: String,
    pub origin_url: String,
    pub page_snapshot: PageSnapshot,
    pub submitter_identity: SubmitterIdentity,
}

impl SolveRequest {
    pub fn new(
        origin_url: impl Into<String>,
        page_snapshot: PageSnapshot,
        submitter_identity: SubmitterIdentity,
    ) -> Self {
        Self {
            question_text: page_snapshot.question_text.clone(),
            origin_url: origin_url.into(),
            page_snapshot,
            submitter_identity,
        }
    }

    /// Markup of the page the question came from
    pub fn markup(&self) -> &str {
        &self.page_snapshot.raw_markup
    }

    pub fn email(&self) -> &str {
        &self.submitter_identity.email
    }
}

/// The grading server's answer to a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(rename = "correct", default)]
    pub is_correct: bool,
    /// An empty string on the wire is treated as absent
    #[serde(
        rename = "url",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    /// Negative verdict produced locally when a submission could not be graded
    pub fn rejected<S: Into<String>>(reason: S) -> Self {
        Self {
            is_correct: false,
            next_url: None,
            reason: Some(reason.into()),
        }
    }

    pub fn correct() -> Self {
        Self {
            is_correct: true,
            next_url: None,
            reason: None,
        }
    }

    pub fn with_next_url<S: Into<String>>(mut self, url: S) -> Self {
        let url = url.into();
        self.next_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|url| !url.trim().is_empty()))
}

/// Overall result of a chain run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Success,
    Error,
}

/// Why a chain run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Last verdict was correct and carried no next URL
    Completed,
    /// Last verdict was incorrect and carried no next URL
    Stalled,
    /// The loop ran `max_attempts` times without a terminal verdict
    AttemptCeiling,
    /// A page could not be rendered
    FetchFailed,
    /// The start URL was unusable
    InvalidInput,
    /// Credentials did not match; the chain never started
    AccessDenied,
    /// A fault escaped a component boundary and was caught at the top
    Internal,
}

/// The only value a chain run hands back to its caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainOutcome {
    pub status: ChainStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub attempts: u32,
    pub termination: Termination,
}

impl ChainOutcome {
    pub fn success(attempts: u32) -> Self {
        Self {
            status: ChainStatus::Success,
            message: None,
            attempts,
            termination: Termination::Completed,
        }
    }

    pub fn error<S: Into<String>>(termination: Termination, message: S, attempts: u32) -> Self {
        Self {
            status: ChainStatus::Error,
            message: Some(message.into()),
            attempts,
            termination,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ChainStatus::Success
    }
}
