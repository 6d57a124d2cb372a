//! Auxiliary data for solvers
//!
//! Solvers reach the network only through [`DataSource`], which lets tests
//! serve fixtures from memory. References found in a question are resolved
//! against the quiz page's origin with [`resolve_reference`].

use crate::config::SolverSection;
use crate::fetch::{parse_http_url, FetchError};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Read-only HTTP GET access to auxiliary files
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let bytes = self.get_bytes(url).await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::decode(format!("{url}: {e}")))
    }
}

pub struct HttpDataSource {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl HttpDataSource {
    pub fn new(config: &SolverSection) -> Result<Self, FetchError> {
        // The repository listing API refuses requests without a user agent
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(concat!("quizchain/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            timeout_ms: config.fetch_timeout_secs * 1000,
        })
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = parse_http_url(url)?;
        debug!(url = %parsed, "Fetching auxiliary data");

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

        Ok(response.bytes().await?.to_vec())
    }
}

/// Turn a reference from question text into an absolute URL
///
/// Absolute http(s) references pass through. Anything else is joined to the
/// origin's scheme and host, with or without a leading slash.
pub fn resolve_reference(origin_url: &str, reference: &str) -> Result<String, FetchError> {
    let reference = reference.trim();
    if reference.starts_with("http://") || reference.starts_with("https://") {
        return Ok(reference.to_string());
    }

    let origin = parse_http_url(origin_url)?;
    let path = reference.trim_start_matches("./");
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    Ok(format!("{}{}", origin.origin().ascii_serialization(), path))
}

/// Find the first reference to a file with one of `extensions`
///
/// Absolute URLs win over site-relative paths, which win over `href`/`src`
/// attribute values. The question is searched before the markup.
pub fn find_reference(question: &str, markup: &str, extensions: &[&str]) -> Option<String> {
    let alternation = extensions
        .iter()
        .map(|ext| regex::escape(ext.trim_start_matches('.')))
        .collect::<Vec<_>>()
        .join("|");

    let patterns = [
        format!(r#"(?i)(https?://[^\s<>"']+\.(?:{alternation})\b(?:\?[^\s<>"']*)?)"#),
        format!(r#"(?i)(?:^|[\s("'])(/[^\s<>"']+\.(?:{alternation}))\b"#),
        format!(r#"(?i)(?:href|src)=["']([^"']+\.(?:{alternation})(?:\?[^"']*)?)["']"#),
    ];

    let compiled: Vec<Regex> = patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect();

    for source in [question, markup] {
        for regex in &compiled {
            if let Some(found) = regex.captures(source).and_then(|c| c.get(1)) {
                return Some(found.as_str().to_string());
            }
        }
    }

    None
}

/// Like [`find_reference`], resolved against the origin
pub fn locate(
    origin_url: &str,
    question: &str,
    markup: &str,
    extensions: &[&str],
) -> Option<Result<String, FetchError>> {
    find_reference(question, markup, extensions)
        .map(|reference| resolve_reference(origin_url, &reference))
}
