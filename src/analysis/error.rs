//! Analysis-level errors: the causes carried by a failed [`Outcome`](super::Outcome).

use thiserror::Error;

use crate::domain::DomainError;

/// Why a traversal or computation did not produce a value.
///
/// Cloneable so that one cached failure can be handed to every dependent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("traversal failed at depth {depth} on {node}")]
    TraversalFailed { depth: usize, node: String },

    #[error("{kind} failed: {reason}")]
    ComputationFailed { kind: &'static str, reason: String },

    #[error("cached result of {kind} has an unexpected type")]
    TypeMismatch { kind: &'static str },

    #[error("analysis cancelled")]
    Cancelled,

    #[error("{0}")]
    Domain(#[from] DomainError),
}

impl AnalysisError {
    pub fn computation(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::ComputationFailed {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for analysis operations that either succeed or fail outright.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
