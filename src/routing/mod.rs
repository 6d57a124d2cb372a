//! Content-based routing
//!
//! Two independent decisions are made from a fetched page: which solver answers
//! the question ([`select_solver`]) and where the answer is posted
//! ([`resolve_submit_url`]). Neither can fail.

pub mod router;
pub mod submit_url;

pub use router::{classify, select_solver, Matcher, RouteMatch, RouteRule, SolverKind, ROUTE_TABLE};
pub use submit_url::resolve_submit_url;
