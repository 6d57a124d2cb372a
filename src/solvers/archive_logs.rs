//! Aggregate download events from JSON-lines logs inside a zip archive

use super::data_source::locate;
use super::repo_tree::email_offset;
use super::{DataSource, Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tracing::debug;

pub struct ArchiveLogsSolver {
    data: Arc<dyn DataSource>,
}

impl ArchiveLogsSolver {
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

/// Sum `bytes` over every `"event": "download"` line in every member
///
/// Lines that are not JSON objects are skipped.
pub fn sum_download_bytes(archive: &[u8]) -> Result<i64, SolverError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| SolverError::parse("zip archive", e))?;

    let mut total = 0_i64;
    for idx in 0..zip.len() {
        let mut member = zip
            .by_index(idx)
            .map_err(|e| SolverError::parse("zip member", e))?;
        if member.is_dir() {
            continue;
        }

        let mut contents = Vec::new();
        member
            .read_to_end(&mut contents)
            .map_err(|e| SolverError::parse("zip member", e))?;

        let downloads = contents
            .split(|byte| *byte == b'\n')
            .filter_map(|line| serde_json::from_slice::<Value>(line).ok())
            .filter(|event| event.get("event").and_then(Value::as_str) == Some("download"))
            .map(|event| match event.get("bytes") {
                Some(bytes) => bytes
                    .as_i64()
                    .or_else(|| bytes.as_f64().map(|b| b.trunc() as i64))
                    .unwrap_or(0),
                None => 0,
            });

        for bytes in downloads {
            total = total
                .checked_add(bytes)
                .ok_or_else(|| SolverError::parse("download bytes", "sum overflows i64"))?;
        }
    }

    Ok(total)
}

#[async_trait]
impl Solver for ArchiveLogsSolver {
    fn name(&self) -> &'static str {
        "archive_logs"
    }

    fn sentinel(&self) -> &'static str {
        "0"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let url = locate(
            &request.origin_url,
            &request.question_text,
            request.markup(),
            &[".zip"],
        )
        .ok_or_else(|| SolverError::missing("zip archive"))??;

        let archive = self.data.get_bytes(&url).await?;
        let total = sum_download_bytes(&archive)?;
        let offset = email_offset(request.email(), 5) as i64;
        debug!(url, total, offset, "Download bytes aggregated");

        let answer = total
            .checked_add(offset)
            .ok_or_else(|| SolverError::parse("download bytes", "sum overflows i64"))?;

        Ok(answer.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PageSnapshot, SubmitterIdentity};
    use crate::testing::mocks::MockDataSource;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(members: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_sums_download_events_across_members() {
        let bytes = archive(&[
            (
                "a.jsonl",
                "{\"event\":\"download\",\"bytes\":100}\n{\"event\":\"view\",\"bytes\":999}\nnot json\n",
            ),
            ("b.jsonl", "{\"event\":\"download\",\"bytes\":23}\n{\"event\":\"download\"}\n"),
        ]);
        assert_eq!(sum_download_bytes(&bytes).unwrap(), 123);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            sum_download_bytes(b"PK? no"),
            Err(SolverError::Parse { .. })
        ));
    }

    #[test]
    fn test_overflowing_sum_is_parse_error() {
        let max = i64::MAX;
        let bytes = archive(&[(
            "huge.jsonl",
            &format!("{{\"event\":\"download\",\"bytes\":{max}}}\n{{\"event\":\"download\",\"bytes\":1}}\n"),
        )]);
        assert!(matches!(
            sum_download_bytes(&bytes),
            Err(SolverError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_overflow_answers_sentinel() {
        let max = i64::MAX;
        let data = MockDataSource::new().with_file(
            "https://quiz.example.com/project2/logs.zip",
            archive(&[(
                "logs.jsonl",
                &format!("{{\"event\":\"download\",\"bytes\":{max}}}\n"),
            )]),
        );
        let solver = ArchiveLogsSolver::new(Arc::new(data));
        let request = SolveRequest::new(
            "https://quiz.example.com/q9",
            PageSnapshot::new("", "Sum the download bytes in /project2/logs.zip"),
            SubmitterIdentity::new("a@b.com", "s"),
        );

        assert_eq!(solver.answer(&request).await, "0");
    }

    #[tokio::test]
    async fn test_solver_adds_email_offset() {
        let data = MockDataSource::new().with_file(
            "https://quiz.example.com/project2/logs.zip",
            archive(&[("logs.jsonl", "{\"event\":\"download\",\"bytes\":40}\n")]),
        );
        let solver = ArchiveLogsSolver::new(Arc::new(data));
        let request = SolveRequest::new(
            "https://quiz.example.com/q9",
            PageSnapshot::new("", "Sum the download bytes in /project2/logs.zip"),
            // 7 characters -> offset 2
            SubmitterIdentity::new("a@b.com", "s"),
        );

        assert_eq!(solver.answer(&request).await, "42");
    }
}
