//! Wire types for the `/solve` entry point and the grading endpoint
//!
//! The grading server's reply is parsed straight into [`crate::chain::Verdict`];
//! everything else crossing a process boundary lives here.

pub mod messages;

pub use messages::*;
