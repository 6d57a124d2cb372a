//! Questions whose answer is a site-relative Markdown path quoted on the page

use super::{Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:^|[\s("'`=])(/[^\s"'<>`]+\.md)\b"#).expect("valid markdown path pattern")
});

pub struct LiteralPathSolver;

#[async_trait]
impl Solver for LiteralPathSolver {
    fn name(&self) -> &'static str {
        "literal_path"
    }

    fn sentinel(&self) -> &'static str {
        "/project2/data-preparation.md"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        [request.question_text.as_str(), request.markup()]
            .into_iter()
            .find_map(|source| MARKDOWN_PATH.captures(source))
            .map(|captures| captures[1].to_string())
            .ok_or_else(|| SolverError::missing("Markdown path"))
    }
}
