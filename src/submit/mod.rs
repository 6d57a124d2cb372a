//! Answer submission
//!
//! [`SubmissionClient::submit`] is infallible by construction: every transport
//! or HTTP failure comes back as a negative [`Verdict`] with a reason, so the
//! chain only ever branches on the verdict.

pub mod http;

use crate::chain::Verdict;
use crate::protocol::SubmissionPayload;
use async_trait::async_trait;

pub use http::HttpSubmissionClient;

#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn submit(&self, submit_url: &str, payload: &SubmissionPayload) -> Verdict;
}
