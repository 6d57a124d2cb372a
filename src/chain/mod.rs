//! Quiz chain: data model and the orchestrator loop
//!
//! A chain run drives one page at a time through
//! fetch → route → solve → submit → advance until the grading server stops
//! handing out next URLs or the attempt ceiling is reached.

pub mod orchestrator;
pub mod types;

pub use orchestrator::ChainRunner;
pub use types::{
    ChainOutcome, ChainStatus, PageSnapshot, QuizStep, SolveRequest, SubmitterIdentity,
    Termination, Verdict,
};
