//! Fixed set of solvers, one per [`SolverKind`]

use super::{
    ArchiveLogsSolver, AudioSolver, CsvNormalizeSolver, CsvSumSolver, DataSource,
    GitCommandSolver, HttpDataSource, ImageColorSolver, LiteralPathSolver, OpenEndedSolver,
    RepoTreeSolver, ScrapeSolver, Solver, UvCommandSolver,
};
use crate::config::{AppConfig, LlmSection, RuntimeSecrets, SolverSection};
use crate::error::{QuizError, QuizResult};
use crate::fetch::PageFetcher;
use crate::llm::{LlmProvider, OpenAiConfig, OpenAiProvider, Transcriber};
use crate::routing::{classify, RouteMatch, SolverKind};
use std::sync::Arc;
use tracing::{info, warn};

/// Collaborators the built-in solvers are constructed from
#[derive(Clone)]
pub struct SolverDeps {
    pub data: Arc<dyn DataSource>,
    pub page_fetcher: Arc<dyn PageFetcher>,
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub llm_settings: LlmSection,
    pub settings: SolverSection,
}

impl SolverDeps {
    /// Production collaborators: HTTP data source and, when a token is
    /// available, the OpenAI-compatible provider for both LLM capabilities
    pub fn from_config(
        config: &AppConfig,
        secrets: &RuntimeSecrets,
        page_fetcher: Arc<dyn PageFetcher>,
    ) -> QuizResult<Self> {
        let data = HttpDataSource::new(&config.solvers)
            .map_err(|e| QuizError::internal_error(format!("data source: {e}")))?;

        let (llm, transcriber): (Option<Arc<dyn LlmProvider>>, Option<Arc<dyn Transcriber>>) =
            match secrets.llm_token.as_deref() {
                Some(token) => {
                    let provider_config = OpenAiConfig::for_token(token, &config.llm);
                    let provider = Arc::new(OpenAiProvider::new(provider_config)?);
                    info!(base_url = provider.base_url(), "LLM provider configured");
                    let llm: Arc<dyn LlmProvider> = provider.clone();
                    let transcriber: Arc<dyn Transcriber> = provider;
                    (Some(llm), Some(transcriber))
                }
                None => {
                    warn!("No LLM token configured; open-ended and audio questions will get sentinels");
                    (None, None)
                }
            };

        Ok(Self {
            data: Arc::new(data),
            page_fetcher,
            llm,
            transcriber,
            llm_settings: config.llm.clone(),
            settings: config.solvers.clone(),
        })
    }
}

pub struct SolverRegistry {
    solvers: [Arc<dyn Solver>; SolverKind::COUNT],
}

impl SolverRegistry {
    /// Registry with every built-in solver
    pub fn new(deps: &SolverDeps) -> Self {
        Self {
            solvers: SolverKind::ALL.map(|kind| builtin(kind, deps)),
        }
    }

    /// Registry where every kind is served by `factory`
    pub fn from_fn<F>(factory: F) -> Self
    where
        F: FnMut(SolverKind) -> Arc<dyn Solver>,
    {
        Self {
            solvers: SolverKind::ALL.map(factory),
        }
    }

    /// Replace the solver for one kind
    pub fn with_solver(mut self, kind: SolverKind, solver: Arc<dyn Solver>) -> Self {
        self.solvers[kind.index()] = solver;
        self
    }

    pub fn get(&self, kind: SolverKind) -> Arc<dyn Solver> {
        Arc::clone(&self.solvers[kind.index()])
    }

    /// Route a question and hand back the solver that should answer it
    pub fn route(&self, question_text: &str) -> (RouteMatch, Arc<dyn Solver>) {
        let route = classify(question_text);
        (route, self.get(route.kind))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.solvers.iter().map(|solver| solver.name()).collect()
    }
}

fn builtin(kind: SolverKind, deps: &SolverDeps) -> Arc<dyn Solver> {
    match kind {
        SolverKind::UvCommand => Arc::new(UvCommandSolver),
        SolverKind::GitCommand => Arc::new(GitCommandSolver),
        SolverKind::LiteralPath => Arc::new(LiteralPathSolver),
        SolverKind::ImageColor => Arc::new(ImageColorSolver::new(deps.data.clone())),
        SolverKind::AudioTranscription => Arc::new(AudioSolver::new(
            deps.data.clone(),
            deps.transcriber.clone(),
        )),
        SolverKind::CsvNormalize => Arc::new(CsvNormalizeSolver::new(deps.data.clone())),
        SolverKind::CsvSum => Arc::new(CsvSumSolver::new(deps.data.clone())),
        SolverKind::RepoTree => Arc::new(RepoTreeSolver::new(
            deps.data.clone(),
            deps.settings.repo_api_base_url.clone(),
        )),
        SolverKind::ArchiveLogs => Arc::new(ArchiveLogsSolver::new(deps.data.clone())),
        SolverKind::ScrapeSecret => Arc::new(ScrapeSolver::new(deps.page_fetcher.clone())),
        SolverKind::OpenEnded => Arc::new(OpenEndedSolver::new(
            deps.data.clone(),
            deps.llm.clone(),
            &deps.llm_settings,
            &deps.settings,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::{FixedAnswerSolver, MockDataSource, MockPageFetcher};

    fn deps() -> SolverDeps {
        SolverDeps {
            data: Arc::new(MockDataSource::new()),
            page_fetcher: Arc::new(MockPageFetcher::new()),
            llm: None,
            transcriber: None,
            llm_settings: LlmSection::default(),
            settings: SolverSection::default(),
        }
    }

    #[test]
    fn test_every_kind_has_matching_solver() {
        let registry = SolverRegistry::new(&deps());
        for kind in SolverKind::ALL {
            assert_eq!(registry.get(kind).name(), kind.as_str());
        }
    }

    #[test]
    fn test_route_returns_selected_solver() {
        let registry = SolverRegistry::new(&deps());
        let (route, solver) = registry.route("What color is /project2/heatmap.png?");
        assert_eq!(route.kind, SolverKind::ImageColor);
        assert_eq!(solver.name(), "image_color");
    }

    #[test]
    fn test_with_solver_overrides_one_kind() {
        let registry = SolverRegistry::new(&deps())
            .with_solver(SolverKind::CsvSum, Arc::new(FixedAnswerSolver::new("42")));

        assert_eq!(registry.get(SolverKind::CsvSum).name(), "fixed");
        assert_eq!(registry.get(SolverKind::CsvNormalize).name(), "csv_normalize");
    }

    #[test]
    fn test_sentinels_are_documented_values() {
        let registry = SolverRegistry::new(&deps());
        let expected = [
            (SolverKind::UvCommand, "uv http get https://example.com"),
            (SolverKind::GitCommand, "git log --oneline"),
            (SolverKind::LiteralPath, "/project2/data-preparation.md"),
            (SolverKind::ImageColor, "#000000"),
            (SolverKind::AudioTranscription, "0"),
            (SolverKind::CsvNormalize, "[]"),
            (SolverKind::CsvSum, "0"),
            (SolverKind::RepoTree, "0"),
            (SolverKind::ArchiveLogs, "0"),
            (SolverKind::ScrapeSecret, "not_found"),
            (SolverKind::OpenEnded, "anything you want"),
        ];
        for (kind, sentinel) in expected {
            assert_eq!(registry.get(kind).sentinel(), sentinel, "{kind}");
        }
    }
}
