//! Headless Chromium page fetcher
//!
//! Each fetch launches its own browser and tears it down afterwards, so no
//! cookies, storage or open targets survive between quiz pages.

use super::{parse_http_url, FetchError, PageFetcher};
use crate::chain::PageSnapshot;
use crate::config::FetcherSection;
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};

/// Body text including nodes hidden by CSS
const BODY_TEXT_SCRIPT: &str = "document.body ? document.body.textContent : ''";

pub struct HeadlessPageFetcher {
    config: FetcherSection,
}

impl HeadlessPageFetcher {
    pub fn new(config: FetcherSection) -> Self {
        Self { config }
    }

    fn browser_config(&self) -> Result<BrowserConfig, FetchError> {
        let mut builder = BrowserConfig::builder().new_headless_mode().args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--remote-debugging-port=0",
        ]);

        if let Some(executable) = &self.config.chrome_executable {
            builder = builder.chrome_executable(executable);
        }

        builder.build().map_err(|e| {
            error!("Failed to configure headless browser: {}", e);
            FetchError::browser(format!("invalid browser config: {e}"))
        })
    }

    async fn render(&self, browser: &Browser, url: &str) -> Result<PageSnapshot, FetchError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::browser(format!("failed to open page: {e}")))?;

        let load_timeout = Duration::from_millis(self.config.page_load_timeout_ms);
        timeout(load_timeout, navigate(&page, url))
            .await
            .map_err(|_| FetchError::Timeout {
                timeout_ms: self.config.page_load_timeout_ms,
            })??;

        sleep(Duration::from_millis(self.config.settle_delay_ms)).await;

        let markup = page
            .content()
            .await
            .map_err(|e| FetchError::browser(format!("failed to read markup: {e}")))?;

        let question: String = page
            .evaluate(BODY_TEXT_SCRIPT)
            .await
            .map_err(|e| FetchError::browser(format!("failed to read body text: {e}")))?
            .into_value()
            .map_err(|e| FetchError::decode(format!("body text: {e}")))?;

        if let Err(e) = page.close().await {
            debug!("Closing page failed: {}", e);
        }

        Ok(PageSnapshot::new(markup, question.trim()))
    }
}

async fn navigate(page: &Page, url: &str) -> Result<(), FetchError> {
    page.goto(url)
        .await
        .map_err(|e| FetchError::browser(format!("navigation failed: {e}")))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| FetchError::browser(format!("navigation did not settle: {e}")))?;
    Ok(())
}

#[async_trait]
impl PageFetcher for HeadlessPageFetcher {
    fn name(&self) -> &'static str {
        "headless"
    }

    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        parse_http_url(url)?;
        debug!(url, "Launching headless browser");

        let (mut browser, mut handler) =
            Browser::launch(self.browser_config()?).await.map_err(|e| {
                error!("Failed to launch headless browser: {}", e);
                FetchError::browser(format!("launch failed: {e}"))
            })?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let result = self.render(&browser, url).await;

        if let Err(e) = browser.close().await {
            warn!("Failed to close headless browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Browser process did not exit cleanly: {}", e);
        }
        events.abort();

        result
    }
}
