//! Mock implementations for testing
//!
//! Scripted stand-ins for every collaborator the chain and the solvers talk
//! to: page fetching, answer submission, auxiliary data, the language model
//! and transcription. Each mock is `Clone` and shares its recorded history
//! between clones, so a test can keep a handle after boxing one into an `Arc`.

use crate::chain::{PageSnapshot, SolveRequest, Verdict};
use crate::fetch::{FetchError, PageFetcher};
use crate::llm::provider::{
    AudioClip, CompletionRequest, CompletionResponse, FinishReason, LlmError, LlmProvider,
    TokenUsage, Transcriber,
};
use crate::protocol::SubmissionPayload;
use crate::solvers::{DataSource, Solver, SolverError};
use crate::submit::SubmissionClient;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn not_found(url: &str) -> FetchError {
    FetchError::Http {
        status: 404,
        url: url.to_string(),
    }
}

#[derive(Debug, Clone)]
enum ScriptedPage {
    Page(PageSnapshot),
    Failure(String),
}

/// Mock page fetcher serving snapshots by URL
///
/// Unknown URLs fail with a 404.
#[derive(Debug, Clone, Default)]
pub struct MockPageFetcher {
    pages: Arc<Mutex<HashMap<String, ScriptedPage>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page<S: Into<String>>(self, url: S, page: PageSnapshot) -> Self {
        lock(&self.pages).insert(url.into(), ScriptedPage::Page(page));
        self
    }

    /// Shorthand for a page whose markup and text are the same question
    pub fn with_question<S: Into<String>, Q: Into<String>>(self, url: S, question: Q) -> Self {
        let question = question.into();
        self.with_page(url, PageSnapshot::new(question.clone(), question))
    }

    /// Rendering `url` fails with a browser error
    pub fn with_failure<S: Into<String>, M: Into<String>>(self, url: S, message: M) -> Self {
        lock(&self.pages).insert(url.into(), ScriptedPage::Failure(message.into()));
        self
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        lock(&self.fetched).clone()
    }

    pub fn fetch_count(&self) -> usize {
        lock(&self.fetched).len()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        lock(&self.fetched).push(url.to_string());

        match lock(&self.pages).get(url).cloned() {
            Some(ScriptedPage::Page(page)) => Ok(page),
            Some(ScriptedPage::Failure(message)) => Err(FetchError::browser(message)),
            None => Err(not_found(url)),
        }
    }
}

/// Mock submission endpoint replaying a queue of verdicts
///
/// Once the queue is empty every submission is rejected without a next URL.
#[derive(Debug, Clone, Default)]
pub struct MockSubmissionClient {
    verdicts: Arc<Mutex<VecDeque<Verdict>>>,
    repeat_last: bool,
    submissions: Arc<Mutex<Vec<(String, SubmissionPayload)>>>,
}

impl MockSubmissionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verdicts(verdicts: Vec<Verdict>) -> Self {
        Self {
            verdicts: Arc::new(Mutex::new(verdicts.into())),
            ..Self::default()
        }
    }

    /// Answer every submission with the same verdict
    pub fn always(verdict: Verdict) -> Self {
        Self {
            repeat_last: true,
            ..Self::with_verdicts(vec![verdict])
        }
    }

    pub fn submissions(&self) -> Vec<(String, SubmissionPayload)> {
        lock(&self.submissions).clone()
    }

    pub fn answers(&self) -> Vec<String> {
        lock(&self.submissions)
            .iter()
            .map(|(_, payload)| payload.answer.clone())
            .collect()
    }
}

#[async_trait]
impl SubmissionClient for MockSubmissionClient {
    async fn submit(&self, submit_url: &str, payload: &SubmissionPayload) -> Verdict {
        lock(&self.submissions).push((submit_url.to_string(), payload.clone()));

        let mut verdicts = lock(&self.verdicts);
        let next = if self.repeat_last && verdicts.len() == 1 {
            verdicts.front().cloned()
        } else {
            verdicts.pop_front()
        };
        next.unwrap_or_else(|| Verdict::rejected("no scripted verdict"))
    }
}

/// Mock auxiliary data served from memory
///
/// Unknown URLs fail with a 404.
#[derive(Debug, Clone, Default)]
pub struct MockDataSource {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file<S: Into<String>>(self, url: S, bytes: Vec<u8>) -> Self {
        lock(&self.files).insert(url.into(), bytes);
        self
    }

    pub fn with_json<S: Into<String>>(self, url: S, value: Value) -> Self {
        let bytes = value.to_string().into_bytes();
        self.with_file(url, bytes)
    }

    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        lock(&self.requests).push(url.to_string());
        lock(&self.files).get(url).cloned().ok_or_else(|| not_found(url))
    }
}

/// Mock LLM provider for testing
#[derive(Debug, Clone)]
pub struct MockLlmProvider {
    pub responses: Vec<String>,
    pub should_fail: bool,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            should_fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new(vec![])
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let index = {
            let mut requests = lock(&self.requests);
            requests.push(request);
            requests.len() - 1
        };

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock LLM failure".to_string()));
        }

        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[index % self.responses.len()].clone()
        };

        Ok(CompletionResponse {
            content: Some(content),
            model: "mock-model".to_string(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            finish_reason: FinishReason::Stop,
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed(
                "Mock health check failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Mock speech-to-text returning a fixed transcript
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    transcript: Option<String>,
    file_names: Arc<Mutex<Vec<String>>>,
}

impl MockTranscriber {
    pub fn new<S: Into<String>>(transcript: S) -> Self {
        Self {
            transcript: Some(transcript.into()),
            file_names: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            file_names: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn file_names(&self) -> Vec<String> {
        lock(&self.file_names).clone()
    }
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe(&self, clip: AudioClip) -> Result<String, LlmError> {
        lock(&self.file_names).push(clip.file_name);
        self.transcript
            .clone()
            .ok_or_else(|| LlmError::ApiError("Mock transcription failure".to_string()))
    }
}

/// Solver that always answers with the same string and counts its calls
#[derive(Debug, Clone)]
pub struct FixedAnswerSolver {
    answer: String,
    questions: Arc<Mutex<Vec<String>>>,
}

impl FixedAnswerSolver {
    pub fn new<S: Into<String>>(answer: S) -> Self {
        Self {
            answer: answer.into(),
            questions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Question texts this solver was asked, in order
    pub fn questions(&self) -> Vec<String> {
        lock(&self.questions).clone()
    }
}

#[async_trait]
impl Solver for FixedAnswerSolver {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn sentinel(&self) -> &'static str {
        "fixed"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        lock(&self.questions).push(request.question_text.clone());
        Ok(self.answer.clone())
    }
}

/// Solver that panics on every call
#[derive(Debug, Clone, Copy, Default)]
pub struct PanickingSolver;

#[async_trait]
impl Solver for PanickingSolver {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn sentinel(&self) -> &'static str {
        "unreachable"
    }

    async fn attempt(&self, _request: &SolveRequest) -> Result<String, SolverError> {
        panic!("solver blew up")
    }
}

/// Solver that sleeps before answering
#[derive(Debug, Clone)]
pub struct SlowSolver {
    pub delay: Duration,
    pub answer: String,
}

impl SlowSolver {
    pub fn new<S: Into<String>>(delay: Duration, answer: S) -> Self {
        Self {
            delay,
            answer: answer.into(),
        }
    }
}

#[async_trait]
impl Solver for SlowSolver {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn sentinel(&self) -> &'static str {
        "slow"
    }

    async fn attempt(&self, _request: &SolveRequest) -> Result<String, SolverError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.answer.clone())
    }
}
