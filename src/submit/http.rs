//! JSON-over-HTTP submission client

use super::SubmissionClient;
use crate::chain::Verdict;
use crate::config::SubmitSection;
use crate::observability::metrics;
use crate::protocol::SubmissionPayload;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpSubmissionClient {
    client: reqwest::Client,
}

impl HttpSubmissionClient {
    pub fn new(config: &SubmitSection) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SubmissionClient for HttpSubmissionClient {
    async fn submit(&self, submit_url: &str, payload: &SubmissionPayload) -> Verdict {
        debug!(submit_url, answer = %payload.answer, "Submitting answer");

        let response = match self.client.post(submit_url).json(payload).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(submit_url, error = %e, "Submission transport failure");
                metrics().submission_failed();
                return Verdict::rejected(e.to_string());
            }
        };

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(submit_url, status = status.as_u16(), "Submission rejected by server");
            metrics().submission_failed();
            return Verdict::rejected(format!("HTTP {}", status.as_u16()));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                metrics().submission_failed();
                return Verdict::rejected(format!("failed to read verdict body: {e}"));
            }
        };

        match serde_json::from_str::<Verdict>(&body) {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(submit_url, error = %e, "Unparseable verdict body");
                metrics().submission_failed();
                Verdict::rejected(format!("invalid verdict body: {e}"))
            }
        }
    }
}
