//! `uv http` command synthesis

use super::{Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

static UV_HTTP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)uv\s+http\s+(\w+)\s+on\s+(https?://[^\s<>"']+)"#)
        .expect("valid uv command pattern")
});

static EMAIL_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*your\s+email\s*>").expect("valid placeholder pattern"));

const ACCEPT_JSON: &str = "Accept: application/json";

/// Builds the `uv http <method> <url>` line a question asks for
pub struct UvCommandSolver;

#[async_trait]
impl Solver for UvCommandSolver {
    fn name(&self) -> &'static str {
        "uv_command"
    }

    fn sentinel(&self) -> &'static str {
        "uv http get https://example.com"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let question =
            EMAIL_PLACEHOLDER.replace_all(&request.question_text, NoExpand(request.email()));

        let captures = UV_HTTP
            .captures(&question)
            .ok_or_else(|| SolverError::missing("uv http command"))?;

        let mut command = format!("uv http {} {}", &captures[1], &captures[2]);
        if request.question_text.contains(ACCEPT_JSON) {
            command.push_str(&format!(" -H \"{ACCEPT_JSON}\""));
        }

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{PageSnapshot, SubmitterIdentity};

    fn request(question: &str) -> SolveRequest {
        SolveRequest::new(
            "https://quiz.example.com/q1",
            PageSnapshot::new("", question),
            SubmitterIdentity::new("me@example.com", "s"),
        )
    }

    #[tokio::test]
    async fn test_builds_command_with_email_and_header() {
        let answer = UvCommandSolver
            .answer(&request(
                "Write the command string: uv http get on https://api.example.com/users?email=<your email> \
                 sending the header Accept: application/json",
            ))
            .await;

        assert_eq!(
            answer,
            "uv http get https://api.example.com/users?email=me@example.com -H \"Accept: application/json\""
        );
    }

    #[tokio::test]
    async fn test_without_header() {
        let answer = UvCommandSolver
            .answer(&request("Give the http command string for uv http POST on https://h.example.com/x"))
            .await;
        assert_eq!(answer, "uv http POST https://h.example.com/x");
    }

    #[tokio::test]
    async fn test_unparseable_question_gets_sentinel() {
        let answer = UvCommandSolver
            .answer(&request("Give the http command string"))
            .await;
        assert_eq!(answer, "uv http get https://example.com");
    }
}
