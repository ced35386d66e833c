//! Analysis layer: formula traversal and the lazy computation graph

pub mod compute;
pub mod error;
pub mod metrics;
pub mod outcome;
pub mod traverse;
pub mod visitors;

pub use error::{AnalysisError, AnalysisResult};
pub use outcome::Outcome;
pub use traverse::{traverse, traverse_all, TraversalAction, TreeVisitor};
