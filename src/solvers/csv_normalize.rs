//! CSV → normalised JSON array
//!
//! Headers become snake_case keys, well-known integer and date columns are
//! typed, and rows are sorted by `id`. Cells that fail to convert keep their
//! trimmed text.

use super::data_source::locate;
use super::{DataSource, Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

const INTEGER_COLUMNS: &[&str] = &["id", "value", "salary", "age", "count"];
const DATE_COLUMNS: &[&str] = &["joined", "date", "signup_date"];
const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";

pub struct CsvNormalizeSolver {
    data: Arc<dyn DataSource>,
}

impl CsvNormalizeSolver {
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

/// `"Signup Date"`, `"signupDate"` and `"signup-date"` all become `signup_date`
pub fn snake_case(header: &str) -> String {
    let mut out = String::with_capacity(header.len() + 4);
    let mut prev: Option<char> = None;

    for ch in header.trim().chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase()
                && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
            {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
        prev = Some(ch);
    }

    out.trim_end_matches('_').to_string()
}

fn normalize_cell(key: &str, raw: &str) -> Value {
    let text = raw.trim();

    if INTEGER_COLUMNS.contains(&key) {
        if let Ok(number) = text.parse::<i64>() {
            return Value::from(number);
        }
    } else if DATE_COLUMNS.contains(&key) {
        if let Some(date) = DATE_INPUT_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        {
            return Value::from(date.format(DATE_OUTPUT_FORMAT).to_string());
        }
    }

    Value::from(text)
}

/// Integers sort before text; rows without an id sort as 0
fn compare_ids(a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
    fn key(row: &Map<String, Value>) -> (u8, i64, String) {
        match row.get("id") {
            None => (0, 0, String::new()),
            Some(Value::Number(n)) => (0, n.as_i64().unwrap_or_default(), String::new()),
            Some(other) => (1, 0, other.as_str().unwrap_or_default().to_string()),
        }
    }
    key(a).cmp(&key(b))
}

/// Normalise CSV text into a compact JSON array
pub fn normalize_csv(text: &str) -> Result<String, SolverError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let keys: Vec<String> = reader
        .headers()
        .map_err(|e| SolverError::parse("CSV header", e))?
        .iter()
        .map(snake_case)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SolverError::parse("CSV row", e))?;
        let row: Map<String, Value> = keys
            .iter()
            .zip(record.iter())
            .map(|(key, raw)| (key.clone(), normalize_cell(key, raw)))
            .collect();
        rows.push(row);
    }

    rows.sort_by(compare_ids);

    serde_json::to_string(&rows).map_err(|e| SolverError::parse("JSON output", e))
}

#[async_trait]
impl Solver for CsvNormalizeSolver {
    fn name(&self) -> &'static str {
        "csv_normalize"
    }

    fn sentinel(&self) -> &'static str {
        "[]"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let url = locate(
            &request.origin_url,
            &request.question_text,
            request.markup(),
            &[".csv"],
        )
        .ok_or_else(|| SolverError::missing("CSV file"))??;

        let text = self.data.get_text(&url).await?;
        normalize_csv(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PageSnapshot, SubmitterIdentity};
    use crate::testing::mocks::MockDataSource;
    use serde_json::json;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("Full Name"), "full_name");
        assert_eq!(snake_case(" signupDate "), "signup_date");
        assert_eq!(snake_case("Signup-Date"), "signup_date");
        assert_eq!(snake_case("ID"), "id");
        assert_eq!(snake_case("value2"), "value2");
    }

    #[test]
    fn test_normalize_types_dates_and_order() {
        let csv = "ID,Full Name,Joined,Value\n\
                   2, Bob ,05/03/2024,17\n\
                   1,Alice,2024-01-31,n/a\n";

        let output = normalize_csv(csv).unwrap();
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(
            value,
            json!([
                {"id": 1, "full_name": "Alice", "joined": "2024-01-31", "value": "n/a"},
                {"id": 2, "full_name": "Bob", "joined": "2024-03-05", "value": 17}
            ])
        );
    }

    #[test]
    fn test_column_order_preserved() {
        let output = normalize_csv("zeta,alpha\n1,2\n").unwrap();
        assert_eq!(output, r#"[{"zeta":"1","alpha":"2"}]"#);
    }

    #[test]
    fn test_unparseable_date_kept_as_text() {
        let output = normalize_csv("id,date\n1,someday\n").unwrap();
        assert_eq!(output, r#"[{"id":1,"date":"someday"}]"#);
    }

    #[test]
    fn test_header_only() {
        assert_eq!(normalize_csv("id,name\n").unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_solver_fetches_linked_csv() {
        let data = MockDataSource::new().with_file(
            "https://quiz.example.com/files/people.csv",
            b"id,name\n3,c\n1,a\n".to_vec(),
        );
        let solver = CsvNormalizeSolver::new(Arc::new(data));
        let request = SolveRequest::new(
            "https://quiz.example.com/q5",
            PageSnapshot::new(
                r#"<a href="/files/people.csv">people</a>"#,
                "Normalize the attached file to JSON",
            ),
            SubmitterIdentity::new("a@b.c", "s"),
        );

        assert_eq!(
            solver.answer(&request).await,
            r#"[{"id":1,"name":"a"},{"id":3,"name":"c"}]"#
        );
    }
}
