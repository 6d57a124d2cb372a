//! Solvers
//!
//! A solver turns a [`SolveRequest`] into an answer string. Each solver
//! implements the fallible [`Solver::attempt`]; the provided [`Solver::answer`]
//! is the contract the chain relies on: it never fails and falls back to the
//! solver's documented sentinel on empty input or any error.
//!
//! Solvers hold no mutable state and fetch at most one referenced file per
//! invocation.

pub mod archive_logs;
pub mod audio;
pub mod command;
pub mod csv_normalize;
pub mod csv_sum;
pub mod data_source;
pub mod git_log;
pub mod image_color;
pub mod literal_path;
pub mod open_ended;
pub mod registry;
pub mod repo_tree;
pub mod scrape;

use crate::chain::SolveRequest;
use crate::fetch::FetchError;
use crate::llm::provider::LlmError;
use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub use archive_logs::ArchiveLogsSolver;
pub use audio::AudioSolver;
pub use command::UvCommandSolver;
pub use csv_normalize::CsvNormalizeSolver;
pub use csv_sum::CsvSumSolver;
pub use data_source::{find_reference, resolve_reference, DataSource, HttpDataSource};
pub use git_log::GitCommandSolver;
pub use image_color::ImageColorSolver;
pub use literal_path::LiteralPathSolver;
pub use open_ended::OpenEndedSolver;
pub use registry::{SolverDeps, SolverRegistry};
pub use repo_tree::RepoTreeSolver;
pub use scrape::ScrapeSolver;

/// Answer used when a panic or timeout means no solver result exists at all
pub const FAILURE_SENTINEL: &str = "error";

/// Why a solver could not produce a real answer
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("no {what} referenced in question")]
    MissingReference { what: &'static str },

    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("no answer found: {0}")]
    NotFound(String),
}

impl SolverError {
    pub fn missing(what: &'static str) -> Self {
        Self::MissingReference { what }
    }

    pub fn parse<S: ToString>(what: &'static str, message: S) -> Self {
        Self::Parse {
            what,
            message: message.to_string(),
        }
    }
}

#[async_trait]
pub trait Solver: Send + Sync {
    /// Stable identifier used in logs and metrics
    fn name(&self) -> &'static str;

    /// Placeholder answer returned instead of failing
    fn sentinel(&self) -> &'static str;

    /// Compute an answer, reporting why when there is none
    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError>;

    /// Compute an answer, falling back to the sentinel
    async fn answer(&self, request: &SolveRequest) -> String {
        if request.question_text.trim().is_empty() {
            warn!(solver = self.name(), "Empty question, returning sentinel");
            return self.sentinel().to_string();
        }

        match self.attempt(request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(solver = self.name(), error = %e, "Solver failed, returning sentinel");
                self.sentinel().to_string()
            }
        }
    }
}
