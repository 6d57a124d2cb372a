//! Browserless page fetcher for server-rendered quiz pages

use super::{html_to_text, parse_http_url, FetchError, PageFetcher};
use crate::chain::PageSnapshot;
use crate::config::FetcherSection;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub struct HttpPageFetcher {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpPageFetcher {
    pub fn new(config: &FetcherSection) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.page_load_timeout_ms))
            .user_agent(concat!("quizchain/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            timeout_ms: config.page_load_timeout_ms,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        let parsed = parse_http_url(url)?;
        debug!(url = %parsed, "Fetching page over HTTP");

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                FetchError::Network(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let markup = response.text().await?;
        let question = html_to_text(&markup);
        debug!(
            markup_len = markup.len(),
            question_len = question.len(),
            "Page fetched"
        );

        Ok(PageSnapshot::new(markup, question))
    }
}
