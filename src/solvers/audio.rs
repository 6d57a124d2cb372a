//! Spoken answers: download the clip and transcribe it

use super::data_source::locate;
use super::{DataSource, Solver, SolverError};
use crate::chain::SolveRequest;
use crate::llm::{AudioClip, Transcriber};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Extensions in preference order
const AUDIO_EXTENSIONS: &[&str] = &[".opus", ".mp3"];

pub struct AudioSolver {
    data: Arc<dyn DataSource>,
    transcriber: Option<Arc<dyn Transcriber>>,
}

impl AudioSolver {
    pub fn new(data: Arc<dyn DataSource>, transcriber: Option<Arc<dyn Transcriber>>) -> Self {
        Self { data, transcriber }
    }
}

#[async_trait]
impl Solver for AudioSolver {
    fn name(&self) -> &'static str {
        "audio_transcription"
    }

    fn sentinel(&self) -> &'static str {
        "0"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let url = AUDIO_EXTENSIONS
            .iter()
            .find_map(|ext| {
                locate(
                    &request.origin_url,
                    &request.question_text,
                    request.markup(),
                    &[*ext],
                )
            })
            .ok_or_else(|| SolverError::missing("audio clip"))??;

        let transcriber = self
            .transcriber
            .as_ref()
            .ok_or(SolverError::NotConfigured("transcription provider"))?;

        let bytes = self.data.get_bytes(&url).await?;
        let file_name = url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("audio.opus")
            .to_string();

        let text = transcriber
            .transcribe(AudioClip::new(bytes, file_name))
            .await?;
        let text = text.trim().to_string();
        info!(url, transcription = %text, "Audio transcribed");

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PageSnapshot, SubmitterIdentity};
    use crate::testing::mocks::{MockDataSource, MockTranscriber};

    fn request(question: &str) -> SolveRequest {
        SolveRequest::new(
            "https://quiz.example.com/q1",
            PageSnapshot::new("", question),
            SubmitterIdentity::new("a@b.c", "s"),
        )
    }

    #[tokio::test]
    async fn test_prefers_opus_and_trims() {
        let data = MockDataSource::new()
            .with_file("https://quiz.example.com/project2/a.opus", b"OPUS".to_vec())
            .with_file("https://quiz.example.com/project2/a.mp3", b"MP3".to_vec());
        let transcriber = MockTranscriber::new("  the code is 4821 \n");

        let solver = AudioSolver::new(Arc::new(data.clone()), Some(Arc::new(transcriber.clone())));
        let answer = solver
            .answer(&request("Listen to /project2/a.mp3 or /project2/a.opus"))
            .await;

        assert_eq!(answer, "the code is 4821");
        assert_eq!(
            data.requests(),
            vec!["https://quiz.example.com/project2/a.opus".to_string()]
        );
        assert_eq!(transcriber.file_names(), vec!["a.opus".to_string()]);
    }

    #[tokio::test]
    async fn test_without_transcriber_gets_sentinel_and_skips_fetch() {
        let data = MockDataSource::new()
            .with_file("https://quiz.example.com/project2/a.mp3", b"MP3".to_vec());
        let solver = AudioSolver::new(Arc::new(data.clone()), None);

        let answer = solver.answer(&request("Listen to /project2/a.mp3")).await;

        assert_eq!(answer, "0");
        assert!(data.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transcriber_failure_gets_sentinel() {
        let data = MockDataSource::new()
            .with_file("https://quiz.example.com/project2/a.mp3", b"MP3".to_vec());
        let solver = AudioSolver::new(
            Arc::new(data),
            Some(Arc::new(MockTranscriber::failing())),
        );

        assert_eq!(solver.answer(&request("Listen to /project2/a.mp3")).await, "0");
    }
}
