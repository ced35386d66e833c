//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the feature model's structure.
/// These are independent of evaluation and configuration concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A formula references a variable the owning model does not know.
    /// Model and formula are out of sync; this is never recoverable by defaulting.
    #[error("unknown feature referenced by formula: {0}")]
    UnknownFeature(String),

    /// Reading the variables of a formula did not yield a list.
    #[error("cannot resolve formula variables: {0}")]
    UnresolvedFormula(String),

    #[error("duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("unknown parent feature '{parent}' declared for '{feature}'")]
    UnknownParent { feature: String, parent: String },

    #[error("multiple root features: {first}, {second}")]
    MultipleRoots { first: String, second: String },

    #[error("cycle detected in feature hierarchy: {0}")]
    CycleDetected(String),

    #[error("feature hierarchy has no root")]
    MissingRoot,

    #[error("constraint index out of range: {0}")]
    ConstraintNotFound(usize),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
