//! Message types for the quiz service
//!
//! Request and response bodies for `POST /solve`, and the payload posted to a
//! quiz's grading endpoint.

use crate::chain::{ChainOutcome, ChainStatus, SubmitterIdentity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /solve`
///
/// # Examples
/// ```
/// use quizchain::protocol::QuizRequest;
///
/// let request: QuizRequest = serde_json::from_str(
///     r#"{"email": "me@example.com", "secret": "s3cret", "url": "https://quiz.example.com/start"}"#,
/// ).unwrap();
/// assert_eq!(request.url, "https://quiz.example.com/start");
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizRequest {
    pub email: String,
    pub secret: String,
    /// First page of the chain
    pub url: String,
}

impl QuizRequest {
    pub fn identity(&self) -> SubmitterIdentity {
        SubmitterIdentity::new(self.email.clone(), self.secret.clone())
    }
}

impl std::fmt::Debug for QuizRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizRequest")
            .field("email", &self.email)
            .field("secret", &"***")
            .field("url", &self.url)
            .finish()
    }
}

/// Body returned from `POST /solve` once the chain has run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizResponse {
    pub status: ChainStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&ChainOutcome> for QuizResponse {
    fn from(outcome: &ChainOutcome) -> Self {
        Self {
            status: outcome.status,
            message: outcome.message.clone(),
        }
    }
}

/// Body returned when a request is refused before the chain starts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn new<S: Into<String>>(detail: S) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// JSON posted to a quiz's grading endpoint
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionPayload {
    pub email: String,
    pub secret: String,
    /// The quiz page being answered, not the submit URL
    pub url: String,
    pub answer: String,
}

impl SubmissionPayload {
    pub fn new<U: Into<String>, A: Into<String>>(
        identity: &SubmitterIdentity,
        quiz_url: U,
        answer: A,
    ) -> Self {
        Self {
            email: identity.email.clone(),
            secret: identity.secret.clone(),
            url: quiz_url.into(),
            answer: answer.into(),
        }
    }
}

impl std::fmt::Debug for SubmissionPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionPayload")
            .field("email", &self.email)
            .field("secret", &"***")
            .field("url", &self.url)
            .field("answer", &self.answer)
            .finish()
    }
}

/// Result of probing one dependency
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentHealth {
    pub component: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub response_time_ms: u64,
}

/// Liveness report for `GET /health`
///
/// `status` is `degraded` when a probed component is unhealthy; the process
/// itself still answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub instance_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentHealth>,
}

impl HealthStatus {
    pub fn healthy(instance_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            status: "healthy".to_string(),
            instance_id,
            started_at,
            uptime_secs: (Utc::now() - started_at).num_seconds(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: ComponentHealth) -> Self {
        if !component.healthy {
            self.status = "degraded".to_string();
        }
        self.components.push(component);
        self
    }
}
