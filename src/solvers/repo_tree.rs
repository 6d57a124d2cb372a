//! Count files in a repository tree listing
//!
//! The question links a small JSON config naming the repository and commit;
//! the listing comes from the hosting API's recursive tree endpoint.

use super::data_source::locate;
use super::{DataSource, Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    #[serde(default)]
    pub path_prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    ".md".to_string()
}

#[derive(Debug, Deserialize)]
struct TreeListing {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    #[serde(default)]
    path: String,
}

pub struct RepoTreeSolver {
    data: Arc<dyn DataSource>,
    api_base_url: String,
}

impl RepoTreeSolver {
    pub fn new<S: Into<String>>(data: Arc<dyn DataSource>, api_base_url: S) -> Self {
        Self {
            data,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn tree_url(&self, query: &TreeQuery) -> String {
        format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base_url, query.owner, query.repo, query.sha
        )
    }
}

/// Per-submitter offset added to the raw count
pub fn email_offset(email: &str, modulus: usize) -> usize {
    email.chars().count() % modulus
}

#[async_trait]
impl Solver for RepoTreeSolver {
    fn name(&self) -> &'static str {
        "repo_tree"
    }

    fn sentinel(&self) -> &'static str {
        "0"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let config_url = locate(
            &request.origin_url,
            &request.question_text,
            request.markup(),
            &[".json"],
        )
        .ok_or_else(|| SolverError::missing("tree query config"))??;

        let query: TreeQuery = serde_json::from_value(self.data.get_json(&config_url).await?)
            .map_err(|e| SolverError::parse("tree query config", e))?;

        let listing: TreeListing = serde_json::from_value(
            self.data.get_json(&self.tree_url(&query)).await?,
        )
        .map_err(|e| SolverError::parse("tree listing", e))?;

        let count = listing
            .tree
            .iter()
            .filter(|entry| {
                entry.path.starts_with(&query.path_prefix) && entry.path.ends_with(&query.extension)
            })
            .count();

        debug!(
            owner = %query.owner,
            repo = %query.repo,
            entries = listing.tree.len(),
            count,
            "Tree entries counted"
        );

        Ok((count + email_offset(request.email(), 2)).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PageSnapshot, SubmitterIdentity};
    use crate::testing::mocks::MockDataSource;
    use serde_json::json;

    fn request(email: &str) -> SolveRequest {
        SolveRequest::new(
            "https://quiz.example.com/q7",
            PageSnapshot::new("", "Use the GitHub API tree described in /project2/gh-tree.json"),
            SubmitterIdentity::new(email, "s"),
        )
    }

    fn data() -> MockDataSource {
        MockDataSource::new()
            .with_json(
                "https://quiz.example.com/project2/gh-tree.json",
                json!({"owner": "octo", "repo": "docs", "sha": "abc123", "pathPrefix": "guide/"}),
            )
            .with_json(
                "https://api.example.com/repos/octo/docs/git/trees/abc123?recursive=1",
                json!({"tree": [
                    {"path": "guide/intro.md"},
                    {"path": "guide/setup.md"},
                    {"path": "guide/img.png"},
                    {"path": "README.md"}
                ]}),
            )
    }

    #[tokio::test]
    async fn test_counts_matching_paths_with_even_email() {
        let solver = RepoTreeSolver::new(Arc::new(data()), "https://api.example.com/");
        // 12 characters -> offset 0
        assert_eq!(solver.answer(&request("ab@cdefg.com")).await, "2");
    }

    #[tokio::test]
    async fn test_odd_email_adds_one() {
        let solver = RepoTreeSolver::new(Arc::new(data()), "https://api.example.com");
        // 13 characters -> offset 1
        assert_eq!(solver.answer(&request("abc@cdefg.com")).await, "3");
    }

    #[tokio::test]
    async fn test_bad_config_gets_sentinel() {
        let data = MockDataSource::new().with_json(
            "https://quiz.example.com/project2/gh-tree.json",
            json!({"owner": "octo"}),
        );
        let solver = RepoTreeSolver::new(Arc::new(data), "https://api.example.com");
        assert_eq!(solver.answer(&request("a@b.c")).await, "0");
    }

    #[test]
    fn test_query_defaults() {
        let query: TreeQuery =
            serde_json::from_value(json!({"owner": "o", "repo": "r", "sha": "s"})).unwrap();
        assert_eq!(query.path_prefix, "");
        assert_eq!(query.extension, ".md");
    }
}
