//! Render a linked page and pull a secret out of it

use super::{resolve_reference, Solver, SolverError};
use crate::chain::{PageSnapshot, SolveRequest};
use crate::fetch::PageFetcher;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

static SCRAPE_TARGET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Scrape\s+([\w/?\-=&@.:%]+)").expect("valid scrape target pattern")
});

enum Source {
    Text,
    Markup,
}

/// Extraction patterns, tried in order; capture group 1 is the secret
static SECRET_PATTERNS: Lazy<Vec<(Source, Regex)>> = Lazy::new(|| {
    [
        (Source::Text, r"(?i)Secret\s+code\s+is\s+([0-9a-zA-Z_\-]+)"),
        (Source::Text, r"(?i)code\s*:\s*([0-9a-zA-Z_\-]+)"),
        (Source::Markup, r"<!--\s*([0-9a-zA-Z_\-]{6,})\s*-->"),
        (Source::Markup, r#"(?i)data-secret=["']([^"']+)["']"#),
        (Source::Text, r"\b(\d{4,})\b"),
    ]
    .into_iter()
    .map(|(source, pattern)| (source, Regex::new(pattern).expect("valid secret pattern")))
    .collect()
});

/// First secret found on a rendered page
pub fn extract_secret(page: &PageSnapshot) -> Option<String> {
    SECRET_PATTERNS.iter().find_map(|(source, regex)| {
        let haystack = match source {
            Source::Text => page.question_text.as_str(),
            Source::Markup => page.raw_markup.as_str(),
        };
        regex
            .captures(haystack)
            .map(|captures| captures[1].trim().to_string())
    })
}

pub struct ScrapeSolver {
    fetcher: Arc<dyn PageFetcher>,
}

impl ScrapeSolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl Solver for ScrapeSolver {
    fn name(&self) -> &'static str {
        "scrape_secret"
    }

    fn sentinel(&self) -> &'static str {
        "not_found"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let target = SCRAPE_TARGET
            .captures(&request.question_text)
            .map(|c| c[1].trim_end_matches(['.', ',']).to_string())
            .ok_or_else(|| SolverError::missing("page to scrape"))?;

        let url = resolve_reference(&request.origin_url, &target)?;
        debug!(url, "Scraping page");

        let page = self.fetcher.fetch(&url).await?;
        let secret = extract_secret(&page)
            .ok_or_else(|| SolverError::NotFound(format!("no secret on {url}")))?;
        info!(url, secret = %secret, "Secret extracted");

        Ok(secret)
    }
}
