//! Feature model constraint analysis.
//!
//! - [`domain`]: formulas, feature hierarchies, constraints, assignments
//! - [`analysis`]: visitor-driven traversal, memoized computation graph, metrics
//! - [`config`]: layered settings for evaluation
//! - [`application`]: errors surfaced to callers wiring the pieces together

pub mod analysis;
pub mod application;
pub mod config;
pub mod domain;
pub mod util;
