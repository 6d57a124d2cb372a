//! Page fetching
//!
//! The chain only knows the [`PageFetcher`] trait. The service picks one of two
//! implementations from configuration: a headless browser for pages that build
//! their question client-side, or a plain HTTP client for static pages.

pub mod headless;
pub mod html;
pub mod http;

use crate::chain::PageSnapshot;
use crate::config::{FetcherMode, FetcherSection};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use headless::HeadlessPageFetcher;
pub use html::html_to_text;
pub use http::HttpPageFetcher;

/// Failures when retrieving a page or an auxiliary resource
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("browser error: {message}")]
    Browser { message: String },

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("could not decode response: {message}")]
    Decode { message: String },
}

impl FetchError {
    pub fn browser<S: Into<String>>(message: S) -> Self {
        Self::Browser {
            message: message.into(),
        }
    }

    pub fn invalid_url<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}

/// Renders a URL into a [`PageSnapshot`]
///
/// Implementations must bound every call with their own timeout and must not
/// keep state between calls.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Human-readable implementation name for logs
    fn name(&self) -> &'static str;

    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError>;
}

/// Build the page fetcher selected by configuration
pub fn build_page_fetcher(config: &FetcherSection) -> Result<Arc<dyn PageFetcher>, FetchError> {
    let fetcher: Arc<dyn PageFetcher> = match config.mode {
        FetcherMode::Headless => Arc::new(HeadlessPageFetcher::new(config.clone())),
        FetcherMode::Http => Arc::new(HttpPageFetcher::new(config)?),
    };
    Ok(fetcher)
}

/// Reject anything that is not an absolute http(s) URL before handing it to a client
pub(crate) fn parse_http_url(raw: &str) -> Result<url::Url, FetchError> {
    let parsed = url::Url::parse(raw).map_err(|e| FetchError::invalid_url(raw, e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::invalid_url(
            raw,
            format!("unsupported scheme '{other}'"),
        )),
    }
}
