//! Where to post an answer

use once_cell::sync::Lazy;
use regex::Regex;

static SUBMIT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(https?://[^\s<>"']+/submit[^\s<>"']*)"#).expect("valid submit URL pattern")
});

/// Find the grading endpoint for a page
///
/// An absolute `…/submit…` URL in the question wins, then one in the markup,
/// then `/submit` on the origin's host. Unparseable origins come back unchanged.
pub fn resolve_submit_url(question_text: &str, page_markup: &str, origin_url: &str) -> String {
    for source in [question_text, page_markup] {
        if let Some(found) = SUBMIT_URL.find(source) {
            return found.as_str().to_string();
        }
    }

    fallback_submit_url(origin_url)
}

fn fallback_submit_url(origin_url: &str) -> String {
    match url::Url::parse(origin_url) {
        Ok(parsed) if parsed.has_host() => {
            format!("{}/submit", parsed.origin().ascii_serialization())
        }
        _ => origin_url.to_string(),
    }
}
