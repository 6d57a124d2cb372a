//! quizchain
//!
//! Automates server-driven quiz chains: render a quiz page, route its question
//! to one of a fixed set of solvers, submit the answer to the grading endpoint
//! and follow the next URL it hands back, until the chain ends or the attempt
//! ceiling is reached.
//!
//! # Overview
//!
//! - [`chain`]: data model and the [`ChainRunner`] loop
//! - [`routing`]: priority-ordered solver dispatch and submit-URL resolution
//! - [`solvers`]: the [`Solver`](solvers::Solver) contract and built-in solvers
//! - [`fetch`], [`submit`], [`llm`]: collaborators behind traits
//! - [`server`]: the `POST /solve` entry point
//!
//! # Quick Start
//!
//! ```rust
//! use quizchain::routing::{select_solver, resolve_submit_url, SolverKind};
//!
//! assert_eq!(
//!     select_solver("What color is /project2/heatmap.png?"),
//!     SolverKind::ImageColor
//! );
//! assert_eq!(
//!     resolve_submit_url("no endpoint mentioned", "", "https://quiz.example.com/step3"),
//!     "https://quiz.example.com/submit"
//! );
//! ```

pub mod chain;
pub mod config;
pub mod error;
pub mod fetch;
pub mod llm;
pub mod observability;
pub mod protocol;
pub mod routing;
pub mod server;
pub mod solvers;
pub mod submit;
pub mod testing;

pub use chain::{ChainOutcome, ChainRunner, ChainStatus, SubmitterIdentity, Termination, Verdict};
pub use config::{AppConfig, RuntimeSecrets};
pub use error::{QuizError, QuizResult};
