//! Sum of CSV cells above a cutoff

use super::data_source::locate;
use super::{DataSource, Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static CUTOFF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Cutoff[:\s]+(\d+)").expect("valid cutoff pattern"));

pub struct CsvSumSolver {
    data: Arc<dyn DataSource>,
}

impl CsvSumSolver {
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

/// `Cutoff: N` from the question, 0 when absent
pub fn parse_cutoff(question: &str) -> f64 {
    CUTOFF
        .captures(question)
        .and_then(|c| c[1].parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Sum every numeric cell strictly above `cutoff`, truncated toward zero
pub fn sum_above(text: &str, cutoff: f64) -> Result<i64, SolverError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut total = 0.0_f64;
    for record in reader.records() {
        let record = record.map_err(|e| SolverError::parse("CSV row", e))?;
        total += record
            .iter()
            .filter_map(|cell| cell.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > cutoff)
            .sum::<f64>();
    }

    Ok(total.trunc() as i64)
}

#[async_trait]
impl Solver for CsvSumSolver {
    fn name(&self) -> &'static str {
        "csv_sum"
    }

    fn sentinel(&self) -> &'static str {
        "0"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let cutoff = parse_cutoff(&request.question_text);
        let url = locate(
            &request.origin_url,
            &request.question_text,
            request.markup(),
            &[".csv"],
        )
        .ok_or_else(|| SolverError::missing("CSV file"))??;

        let text = self.data.get_text(&url).await?;
        let total = sum_above(&text, cutoff)?;
        debug!(url, cutoff, total, "CSV sum computed");

        Ok(total.to_string())
    }
}
