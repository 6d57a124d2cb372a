//! Chain orchestrator
//!
//! One chain run, strictly sequential:
//! 1. Fetch the current URL (failure ends the run)
//! 2. Resolve the submit URL for this page
//! 3. Route the question text to exactly one solver
//! 4. Solve, with panics and timeouts mapped to [`FAILURE_SENTINEL`]
//! 5. Submit (failures come back as negative verdicts)
//! 6. Advance to the verdict's next URL, or stop
//!
//! The loop is bounded by `max_attempts`. Nothing inside a run, not even a
//! panic, escapes [`ChainRunner::run_chain`]; every ending becomes a
//! [`ChainOutcome`].

use super::types::{ChainOutcome, QuizStep, SolveRequest, SubmitterIdentity, Termination, Verdict};
use crate::config::{ChainSection, MAX_ATTEMPTS_CEILING};
use crate::error::{sanitize_error_message, QuizError, QuizResult};
use crate::fetch::PageFetcher;
use crate::observability::{metrics, SolverOutcome};
use crate::protocol::SubmissionPayload;
use crate::routing::resolve_submit_url;
use crate::solvers::{Solver, SolverRegistry, FAILURE_SENTINEL};
use crate::submit::SubmissionClient;
use crate::{chain_span, solver_span};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

const QUESTION_PREVIEW_CHARS: usize = 200;

pub struct ChainRunner {
    fetcher: Arc<dyn PageFetcher>,
    submitter: Arc<dyn SubmissionClient>,
    registry: Arc<SolverRegistry>,
    max_attempts: u32,
    solver_timeout: Duration,
}

impl ChainRunner {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        submitter: Arc<dyn SubmissionClient>,
        registry: Arc<SolverRegistry>,
        config: &ChainSection,
    ) -> Self {
        Self {
            fetcher,
            submitter,
            registry,
            max_attempts: config.max_attempts.min(MAX_ATTEMPTS_CEILING),
            solver_timeout: Duration::from_secs(config.solver_timeout_secs),
        }
    }

    /// Override the per-solver timeout
    pub fn with_solver_timeout(mut self, timeout: Duration) -> Self {
        self.solver_timeout = timeout;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Drive a chain from `start_url` until it terminates
    pub async fn run_chain(&self, start_url: &str, identity: &SubmitterIdentity) -> ChainOutcome {
        let run_id = Uuid::new_v4();
        let span = chain_span!(run_id = %run_id, start_url, email = %identity.email);
        let started = Instant::now();
        metrics().chain_started();

        let mut attempts = 0_u32;
        let result = AssertUnwindSafe(self.drive(start_url, identity, &mut attempts))
            .catch_unwind()
            .instrument(span.clone())
            .await;

        let outcome = span.in_scope(|| match result {
            Ok(Ok(())) => {
                info!(attempts, "Chain completed");
                ChainOutcome::success(attempts)
            }
            Ok(Err(e)) => {
                warn!(attempts, termination = ?e.termination(), error = %e, "Chain ended without success");
                ChainOutcome::error(e.termination(), e.public_message(), attempts)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(attempts, panic = %message, "Chain run panicked");
                ChainOutcome::error(
                    Termination::Internal,
                    sanitize_error_message(&format!("Internal error: {message}")),
                    attempts,
                )
            }
        });

        metrics().chain_finished(outcome.termination, started.elapsed());
        outcome
    }

    async fn drive(
        &self,
        start_url: &str,
        identity: &SubmitterIdentity,
        attempts: &mut u32,
    ) -> QuizResult<()> {
        let mut current_url = start_url.trim().to_string();
        if current_url.is_empty() {
            return Err(QuizError::invalid_input("start URL is empty"));
        }

        while *attempts < self.max_attempts {
            *attempts += 1;
            let step = QuizStep {
                url: current_url,
                attempt_index: *attempts,
            };

            let verdict = self.attempt(&step, identity).await?;
            match verdict.next_url {
                Some(next_url) => {
                    if !verdict.is_correct {
                        info!(next_url = %next_url, "Incorrect, but the server offered a next URL");
                    }
                    current_url = next_url;
                }
                None if verdict.is_correct => return Ok(()),
                None => {
                    let reason = verdict
                        .reason
                        .unwrap_or_else(|| "incorrect answer".to_string());
                    return Err(QuizError::chain_stalled(step.url, reason));
                }
            }
        }

        Err(QuizError::attempt_ceiling(*attempts))
    }

    /// One loop iteration: fetch, route, solve, submit
    async fn attempt(&self, step: &QuizStep, identity: &SubmitterIdentity) -> QuizResult<Verdict> {
        info!(
            attempt = step.attempt_index,
            max_attempts = self.max_attempts,
            url = %step.url,
            "Starting attempt"
        );
        metrics().attempt_started();

        let page = self.fetcher.fetch(&step.url).await.map_err(|e| {
            metrics().fetch_failed();
            QuizError::page_fetch(&step.url, e)
        })?;
        info!(question = %page.question_preview(QUESTION_PREVIEW_CHARS), "Question extracted");

        let submit_url = resolve_submit_url(&page.question_text, &page.raw_markup, &step.url);
        let (route, solver) = self.registry.route(&page.question_text);
        info!(
            submit_url = %submit_url,
            solver = solver.name(),
            route = %route.kind,
            rule = ?route.rule_index,
            "Solver selected"
        );

        let request = SolveRequest::new(step.url.clone(), page, identity.clone());
        let answer = self.solve(solver, &request, step.attempt_index).await;
        info!(answer = %answer, "Answer computed");

        let payload = SubmissionPayload::new(identity, step.url.clone(), answer);
        let verdict = self.submitter.submit(&submit_url, &payload).await;
        metrics().answer_submitted(verdict.is_correct);
        info!(
            correct = verdict.is_correct,
            next_url = verdict.next_url.as_deref().unwrap_or(""),
            reason = verdict.reason.as_deref().unwrap_or(""),
            "Verdict received"
        );

        Ok(verdict)
    }

    /// Run a solver to completion, never failing
    async fn solve(&self, solver: Arc<dyn Solver>, request: &SolveRequest, attempt: u32) -> String {
        let span = solver_span!(solver = solver.name(), attempt);
        let started = Instant::now();

        let guarded = AssertUnwindSafe(solver.answer(request)).catch_unwind();
        let (answer, outcome) = match tokio::time::timeout(self.solver_timeout, guarded)
            .instrument(span.clone())
            .await
        {
            Ok(Ok(answer)) => {
                let outcome = if answer == solver.sentinel() {
                    SolverOutcome::Sentinel
                } else {
                    SolverOutcome::Answered
                };
                (answer, outcome)
            }
            Ok(Err(panic)) => {
                span.in_scope(|| {
                    error!(panic = %panic_message(panic.as_ref()), "Solver panicked")
                });
                (FAILURE_SENTINEL.to_string(), SolverOutcome::Panicked)
            }
            Err(_) => {
                span.in_scope(|| {
                    warn!(timeout_secs = self.solver_timeout.as_secs_f64(), "Solver timed out")
                });
                (FAILURE_SENTINEL.to_string(), SolverOutcome::TimedOut)
            }
        };

        metrics().solver_invoked(solver.name(), started.elapsed(), outcome);
        answer
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainStatus, PageSnapshot};
    use crate::routing::SolverKind;
    use crate::testing::mocks::{
        FixedAnswerSolver, MockPageFetcher, MockSubmissionClient, PanickingSolver, SlowSolver,
    };

    fn identity() -> SubmitterIdentity {
        SubmitterIdentity::new("student@example.com", "s3cret")
    }

    fn fixed_registry(answer: &str) -> Arc<SolverRegistry> {
        let solver: Arc<dyn Solver> = Arc::new(FixedAnswerSolver::new(answer));
        Arc::new(SolverRegistry::from_fn(|_| solver.clone()))
    }

    fn runner(
        fetcher: &MockPageFetcher,
        submitter: &MockSubmissionClient,
        registry: Arc<SolverRegistry>,
    ) -> ChainRunner {
        ChainRunner::new(
            Arc::new(fetcher.clone()),
            Arc::new(submitter.clone()),
            registry,
            &ChainSection::default(),
        )
    }

    #[tokio::test]
    async fn test_correct_without_next_url_succeeds() {
        let fetcher = MockPageFetcher::new().with_question("https://q.example.com/1", "What is 6*7?");
        let submitter = MockSubmissionClient::with_verdicts(vec![Verdict::correct()]);

        let outcome = runner(&fetcher, &submitter, fixed_registry("42"))
            .run_chain("https://q.example.com/1", &identity())
            .await;

        assert_eq!(outcome.status, ChainStatus::Success);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.message.is_none());

        let submissions = submitter.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, "https://q.example.com/submit");
        assert_eq!(submissions[0].1.url, "https://q.example.com/1");
        assert_eq!(submissions[0].1.answer, "42");
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal_after_one_attempt() {
        let fetcher = MockPageFetcher::new().with_failure("https://q.example.com/1", "crashed");
        let submitter = MockSubmissionClient::new();

        let outcome = runner(&fetcher, &submitter, fixed_registry("x"))
            .run_chain("https://q.example.com/1", &identity())
            .await;

        assert_eq!(outcome.status, ChainStatus::Error);
        assert_eq!(outcome.termination, Termination::FetchFailed);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(fetcher.fetch_count(), 1);
        assert!(submitter.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_incorrect_with_next_url_advances() {
        let fetcher = MockPageFetcher::new()
            .with_question("https://q.example.com/1", "first")
            .with_question("https://q.example.com/2", "second");
        let submitter = MockSubmissionClient::with_verdicts(vec![
            Verdict::rejected("wrong").with_next_url("https://q.example.com/2"),
            Verdict::correct(),
        ]);

        let outcome = runner(&fetcher, &submitter, fixed_registry("a"))
            .run_chain("https://q.example.com/1", &identity())
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(
            fetcher.fetched_urls(),
            vec!["https://q.example.com/1", "https://q.example.com/2"]
        );
    }

    #[tokio::test]
    async fn test_incorrect_without_next_url_stalls() {
        let fetcher = MockPageFetcher::new().with_question("https://q.example.com/1", "q");
        let submitter = MockSubmissionClient::with_verdicts(vec![Verdict::rejected("HTTP 500")]);

        let outcome = runner(&fetcher, &submitter, fixed_registry("a"))
            .run_chain("https://q.example.com/1", &identity())
            .await;

        assert_eq!(outcome.termination, Termination::Stalled);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.message.unwrap().contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_attempt_ceiling_bounds_the_loop() {
        let fetcher = MockPageFetcher::new().with_question("https://q.example.com/loop", "again");
        let submitter = MockSubmissionClient::always(
            Verdict::rejected("try again").with_next_url("https://q.example.com/loop"),
        );

        let outcome = runner(&fetcher, &submitter, fixed_registry("a"))
            .run_chain("https://q.example.com/loop", &identity())
            .await;

        assert_eq!(outcome.termination, Termination::AttemptCeiling);
        assert_eq!(outcome.attempts, 15);
        assert_eq!(fetcher.fetch_count(), 15);
        assert_eq!(submitter.submissions().len(), 15);
    }

    #[tokio::test]
    async fn test_configured_attempts_above_ceiling_are_capped() {
        let fetcher = MockPageFetcher::new().with_question("https://q.example.com/loop", "again");
        let submitter = MockSubmissionClient::always(
            Verdict::rejected("try again").with_next_url("https://q.example.com/loop"),
        );
        let runner = ChainRunner::new(
            Arc::new(fetcher.clone()),
            Arc::new(submitter.clone()),
            fixed_registry("a"),
            &ChainSection {
                max_attempts: 40,
                ..ChainSection::default()
            },
        );

        assert_eq!(runner.max_attempts(), MAX_ATTEMPTS_CEILING);
        let outcome = runner.run_chain("https://q.example.com/loop", &identity()).await;

        assert_eq!(outcome.termination, Termination::AttemptCeiling);
        assert_eq!(outcome.attempts, 15);
        assert_eq!(fetcher.fetch_count(), 15);
    }

    #[tokio::test]
    async fn test_empty_start_url_is_invalid() {
        let fetcher = MockPageFetcher::new();
        let submitter = MockSubmissionClient::new();

        let outcome = runner(&fetcher, &submitter, fixed_registry("a"))
            .run_chain("   ", &identity())
            .await;

        assert_eq!(outcome.termination, Termination::InvalidInput);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_solver_panic_submits_failure_sentinel() {
        let fetcher = MockPageFetcher::new().with_question("https://q.example.com/1", "q");
        let submitter = MockSubmissionClient::with_verdicts(vec![Verdict::correct()]);
        let registry = Arc::new(SolverRegistry::from_fn(|_| Arc::new(PanickingSolver) as Arc<dyn Solver>));

        let outcome = runner(&fetcher, &submitter, registry)
            .run_chain("https://q.example.com/1", &identity())
            .await;

        assert!(outcome.is_success());
        assert_eq!(submitter.answers(), vec![FAILURE_SENTINEL]);
    }

    #[tokio::test]
    async fn test_slow_solver_times_out_to_failure_sentinel() {
        let fetcher = MockPageFetcher::new().with_question("https://q.example.com/1", "q");
        let submitter = MockSubmissionClient::with_verdicts(vec![Verdict::correct()]);
        let registry = Arc::new(SolverRegistry::from_fn(|_| {
            Arc::new(SlowSolver::new(Duration::from_secs(5), "late")) as Arc<dyn Solver>
        }));

        let outcome = runner(&fetcher, &submitter, registry)
            .with_solver_timeout(Duration::from_millis(50))
            .run_chain("https://q.example.com/1", &identity())
            .await;

        assert!(outcome.is_success());
        assert_eq!(submitter.answers(), vec![FAILURE_SENTINEL]);
    }

    #[tokio::test]
    async fn test_routes_by_question_and_submits_to_page_url() {
        let fetcher = MockPageFetcher::new().with_page(
            "https://q.example.com/img",
            PageSnapshot::new(
                "<p>Post to https://grader.example.com/submit</p>",
                "What color is /project2/heatmap.png?",
            ),
        );
        let submitter = MockSubmissionClient::with_verdicts(vec![Verdict::correct()]);
        let registry = Arc::new(
            SolverRegistry::from_fn(|_| {
                Arc::new(FixedAnswerSolver::new("wrong solver")) as Arc<dyn Solver>
            })
                .with_solver(SolverKind::ImageColor, Arc::new(FixedAnswerSolver::new("#ff0000"))),
        );

        runner(&fetcher, &submitter, registry)
            .run_chain("https://q.example.com/img", &identity())
            .await;

        let submissions = submitter.submissions();
        assert_eq!(submissions[0].0, "https://grader.example.com/submit");
        assert_eq!(submissions[0].1.answer, "#ff0000");
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
