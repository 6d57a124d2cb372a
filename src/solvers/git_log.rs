//! `git log` command synthesis
//!
//! Git questions ask for the single command that lists a slice of history.
//! The command is assembled from phrases in the question: how many commits,
//! whose commits, which file, and whether one-line output is wanted.

use super::{Solver, SolverError};
use crate::chain::SolveRequest;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

static COMMIT_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:last|latest|most\s+recent|first)\s+(\d+|one|two|three|four|five|six|seven|eight|nine|ten)\s+(?:\w+\s+)?commits?\b",
    )
    .expect("valid commit count pattern")
});

static ONE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bone[\s-]?line\b|--oneline").expect("valid one-line pattern")
});

static AUTHOR_EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:author(?:ed)?|by)\s*(?:=|:|is)?\s*<?([\w.+-]+@[\w-]+(?:\.[\w-]+)+)>?")
        .expect("valid author pattern")
});

static OWN_COMMITS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:your\s+(?:own\s+)?(?:commits?|email)|authored\s+by\s+you|you\s+authored)\b")
        .expect("valid own-commits pattern")
});

static FILE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:file|path|touching|modified|changed|in)\s+[`'"]?([\w][\w./-]*\.[A-Za-z0-9]+)[`'"]?"#)
        .expect("valid file pattern")
});

fn parse_count(token: &str) -> Option<u32> {
    let words = [
        "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    ];
    token.parse().ok().or_else(|| {
        let lowered = token.to_ascii_lowercase();
        words
            .iter()
            .position(|word| *word == lowered)
            .map(|idx| idx as u32 + 1)
    })
}

pub struct GitCommandSolver;

#[async_trait]
impl Solver for GitCommandSolver {
    fn name(&self) -> &'static str {
        "git_command"
    }

    fn sentinel(&self) -> &'static str {
        "git log --oneline"
    }

    async fn attempt(&self, request: &SolveRequest) -> Result<String, SolverError> {
        let question = request.question_text.as_str();
        let mut parts = vec!["git".to_string(), "log".to_string()];

        if ONE_LINE.is_match(question) {
            parts.push("--oneline".to_string());
        }

        if let Some(count) = COMMIT_COUNT
            .captures(question)
            .and_then(|c| parse_count(&c[1]))
        {
            parts.push(format!("-n {count}"));
        }

        if let Some(captures) = AUTHOR_EMAIL.captures(question) {
            parts.push(format!("--author={}", &captures[1]));
        } else if OWN_COMMITS.is_match(question) {
            parts.push(format!("--author={}", request.email()));
        }

        if let Some(captures) = FILE_PATH.captures(question) {
            parts.push("--".to_string());
            parts.push(captures[1].to_string());
        }

        Ok(parts.join(" "))
    }
}
