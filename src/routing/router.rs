//! Keyword router
//!
//! Routing is an ordered table of `(matcher, solver)` rules evaluated against the
//! lowercased question. The first matching rule wins and anything that matches
//! nothing goes to the open-ended solver. Rule order is observable behavior:
//! a question mentioning both "csv" and "api tree" is a CSV question.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every solver the registry knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    UvCommand,
    GitCommand,
    LiteralPath,
    ImageColor,
    AudioTranscription,
    CsvNormalize,
    CsvSum,
    RepoTree,
    ArchiveLogs,
    ScrapeSecret,
    OpenEnded,
}

impl SolverKind {
    pub const COUNT: usize = 11;

    pub const ALL: [SolverKind; Self::COUNT] = [
        SolverKind::UvCommand,
        SolverKind::GitCommand,
        SolverKind::LiteralPath,
        SolverKind::ImageColor,
        SolverKind::AudioTranscription,
        SolverKind::CsvNormalize,
        SolverKind::CsvSum,
        SolverKind::RepoTree,
        SolverKind::ArchiveLogs,
        SolverKind::ScrapeSecret,
        SolverKind::OpenEnded,
    ];

    /// Dense index, stable across runs
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolverKind::UvCommand => "uv_command",
            SolverKind::GitCommand => "git_command",
            SolverKind::LiteralPath => "literal_path",
            SolverKind::ImageColor => "image_color",
            SolverKind::AudioTranscription => "audio_transcription",
            SolverKind::CsvNormalize => "csv_normalize",
            SolverKind::CsvSum => "csv_sum",
            SolverKind::RepoTree => "repo_tree",
            SolverKind::ArchiveLogs => "archive_logs",
            SolverKind::ScrapeSecret => "scrape_secret",
            SolverKind::OpenEnded => "open_ended",
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword predicate over lowercased question text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Every keyword must appear
    AllOf(&'static [&'static str]),
    /// At least one keyword must appear
    AnyOf(&'static [&'static str]),
}

impl Matcher {
    /// `haystack` must already be lowercased
    pub fn matches(&self, haystack: &str) -> bool {
        match self {
            Matcher::AllOf(keywords) => keywords.iter().all(|k| haystack.contains(k)),
            Matcher::AnyOf(keywords) => keywords.iter().any(|k| haystack.contains(k)),
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Matcher::AllOf(keywords) | Matcher::AnyOf(keywords) => keywords,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub matcher: Matcher,
    pub kind: SolverKind,
}

const fn rule(matcher: Matcher, kind: SolverKind) -> RouteRule {
    RouteRule { matcher, kind }
}

/// Routing rules in priority order
pub const ROUTE_TABLE: &[RouteRule] = &[
    rule(Matcher::AllOf(&["http", "command string"]), SolverKind::UvCommand),
    rule(Matcher::AllOf(&["git", "commit"]), SolverKind::GitCommand),
    rule(
        Matcher::AnyOf(&["exact string", "relative link target"]),
        SolverKind::LiteralPath,
    ),
    rule(
        Matcher::AnyOf(&["heatmap", "color", ".png"]),
        SolverKind::ImageColor,
    ),
    rule(
        Matcher::AnyOf(&["audio", "listen", ".opus", ".mp3"]),
        SolverKind::AudioTranscription,
    ),
    rule(Matcher::AllOf(&["normalize", "json"]), SolverKind::CsvNormalize),
    rule(Matcher::AnyOf(&["csv", "cutoff"]), SolverKind::CsvSum),
    rule(Matcher::AllOf(&["api", "tree"]), SolverKind::RepoTree),
    rule(Matcher::AnyOf(&["zip", "jsonl"]), SolverKind::ArchiveLogs),
    rule(Matcher::AnyOf(&["scrape", "secret"]), SolverKind::ScrapeSecret),
];

/// Outcome of routing one question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch {
    pub kind: SolverKind,
    /// Position in [`ROUTE_TABLE`], `None` for the fallback
    pub rule_index: Option<usize>,
}

impl RouteMatch {
    pub fn is_fallback(&self) -> bool {
        self.rule_index.is_none()
    }

    /// Keywords of the rule that fired, empty for the fallback
    pub fn keywords(&self) -> &'static [&'static str] {
        self.rule_index
            .map(|idx| ROUTE_TABLE[idx].matcher.keywords())
            .unwrap_or(&[])
    }
}

/// Route a question and report which rule fired
pub fn classify(question_text: &str) -> RouteMatch {
    let lowered = question_text.to_lowercase();

    ROUTE_TABLE
        .iter()
        .position(|rule| rule.matcher.matches(&lowered))
        .map(|idx| RouteMatch {
            kind: ROUTE_TABLE[idx].kind,
            rule_index: Some(idx),
        })
        .unwrap_or(RouteMatch {
            kind: SolverKind::OpenEnded,
            rule_index: None,
        })
}

/// Pick exactly one solver for a question
pub fn select_solver(question_text: &str) -> SolverKind {
    classify(question_text).kind
}
