//! Domain layer: formulas, feature hierarchies and constraints
//!
//! No I/O and no configuration loading. Constraints use the traversal engine
//! from [`crate::analysis`] to derive the features they reference.

pub mod arena;
pub mod assignment;
pub mod builder;
pub mod constraint;
pub mod display;
pub mod error;
pub mod formula;
pub mod model;

pub use arena::{FeatureData, FeatureId, FeatureNode, FeatureTree};
pub use assignment::{AssignmentList, BooleanAssignment};
pub use builder::FeatureTreeBuilder;
pub use constraint::{Constraint, Described, FormulaOwner, Properties, Tagged};
pub use display::TreeDisplay;
pub use error::{DomainError, DomainResult};
pub use formula::{Connective, Node, NodeKind, Terminal};
pub use model::{FeatureLookup, FeatureModel};
