//! Testing utilities and mock implementations
//!
//! Scripted collaborators for exercising the chain, the solvers and the HTTP
//! surface without a browser, a grading server or a language model.
//!
//! ```
//! use quizchain::chain::Verdict;
//! use quizchain::protocol::SubmissionPayload;
//! use quizchain::submit::SubmissionClient;
//! use quizchain::testing::MockSubmissionClient;
//!
//! # tokio_test::block_on(async {
//! let client = MockSubmissionClient::always(Verdict::correct());
//! let payload = SubmissionPayload {
//!     email: "student@example.com".into(),
//!     secret: "s3cret".into(),
//!     url: "https://quiz.example.com/q1".into(),
//!     answer: "42".into(),
//! };
//!
//! let verdict = client.submit("https://quiz.example.com/submit", &payload).await;
//! assert!(verdict.is_correct);
//! assert_eq!(client.answers(), vec!["42".to_string()]);
//! # });
//! ```

pub mod mocks;

pub use mocks::*;
