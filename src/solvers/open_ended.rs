//! Fallback solver: ask the language model
//!
//! At most one data file is attached as context, either the first data file
//! the question references or one of the well-known course files hosted under
//! the configured context base URL.

use super::{find_reference, resolve_reference, DataSource, Solver, SolverError};
use crate::chain::SolveRequest;
use crate::config::{LlmSection, SolverSection};
use crate::llm::{CompletionRequest, LlmProvider, Message};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "\
You answer quiz questions for a data science course.
Extract the answer from the question or from the attached file content.
Rules:
1. Output ONLY the answer, with no explanation and no markdown fences.
2. When asked for a specific value such as a key or code, output only that value.
3. When asked for a command, output only the one-line command.
4. When asked for a count, output only the integer.
5. When asked to decode something, output only the decoded result.";

const CONTEXT_EXTENSIONS: &[&str] = &[".json", ".csv", ".txt", ".sql", ".md"];

const KNOWN_CONTEXT_FILES: &[&str] = &[
    "echo.json",
    "config.json",
    "database.sql",
    "contacts.csv",
    "email.txt",
    "dates.txt",
    "numbers.txt",
    "comments.txt",
];

pub struct OpenEndedSolver {
    data: Arc<dyn DataSource>,
    llm: Option<Arc<dyn LlmProvider>>,
    model: String,
    temperature: f32,
    context_base_url: String,
    max_context_chars: usize,
}

impl OpenEndedSolver {
    pub fn new(
        data: Arc<dyn DataSource>,
        llm: Option<Arc<dyn LlmProvider>>,
        llm_settings: &LlmSection,
        settings: &SolverSection,
    ) -> Self {
        let mut context_base_url = settings.context_base_url.clone();
        if !context_base_url.ends_with('/') {
            context_base_url.push('/');
        }

        Self {
            data,
            llm,
            model: llm_settings.model.clone(),
            temperature: llm_settings.temperature,
            context_base_url,
            max_context_chars: settings.max_context_chars,
        }
    }

    /// URL and display name of the file to attach, if any
    fn context_source(&self, request: &SolveRequest) -> Option<(String, String)> {
        if let Some(reference) =
            find_reference(&request.question_text, request.markup(), CONTEXT_EXTENSIONS)
        {
            match resolve_reference(&request.origin_url, &reference) {
                Ok(url) => return Some((url, reference)),
                Err(e) => debug!(reference, error = %e, "Unresolvable context reference"),
            }
        }

        KNOWN_CONTEXT_FILES
            .iter()
            .find(|name| request.question_text.contains(*name))
            .map(|name| (format!("{}{}", self.context_base_url, name), name.to_string()))
    }

    async fn build_context(&self, request: &SolveRequest) -> String {
        let Some((url, name)) = self.context_source(request) else {
            return String::new();
        };

        match self.data.get_text(&url).await {
            Ok(content) => {
                let content = truncate_chars(&content, self.max_context_chars);
                info!(url, chars = content.chars().count(), "Context attached");
                format!("\n\n--- Content of {name} ---\n{content}\n---")
            }
            Err(e) => {
                warn!(url, error = %e, "Context download failed");
                format!("\n\n(Could not download file {name}: {e})")
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n...(truncated)", &text[..cut]),
        None => text.to_string(),
    }
}

/// Drop a surrounding markdown fence if the model added one anyway
pub fn strip_code_fences(answer: &str) -> String {
    let trimmed = answer.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Skip a language tag on the opening fence line
    let inner = match inner.split_once('\n') {
        Some((tag, rest)) if !tag.trim().contains(' ') => rest,
        _ => inner,
    };
    inner.trim().to_string()
}

#[async_trait]
impl Solver for OpenEndedSolver {
    fn name(&self) -> &'static str {
        "open_ended"
    }

    fn sentinel(&self) -> &'static str {
        "anything you want"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let llm = self
            .llm
            .as_ref()
            .ok_or(SolverError::NotConfigured("language model"))?;

        let context = self.build_context(request).await;
        let completion = CompletionRequest::new(
            self.model.clone(),
            vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(format!("Question: {}{}", request.question_text, context)),
            ],
        )
        .with_temperature(self.temperature);

        let response = llm.complete(completion).await?;
        let answer = strip_code_fences(response.content.as_deref().unwrap_or_default());
        if answer.is_empty() {
            return Err(SolverError::NotFound("empty completion".to_string()));
        }

        info!(model = %response.model, answer = %answer, "Model answered");
        Ok(answer)
    }
}
