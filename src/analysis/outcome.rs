use std::sync::Arc;

use crate::analysis::error::AnalysisError;

/// Outcome of a traversal or a computation.
///
/// Exactly one of: a value, no applicable value, or a failure with its cause.
/// Cancellation is a failure whose cause is [`AnalysisError::Cancelled`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Outcome<T> {
    Value(T),
    Empty,
    Failure(AnalysisError),
}

impl<T> Outcome<T> {
    pub fn cancelled() -> Self {
        Outcome::Failure(AnalysisError::Cancelled)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Failure(AnalysisError::Cancelled))
    }

    pub fn value(self) -> Option<T> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match self {
            Outcome::Failure(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Outcome<&T> {
        match self {
            Outcome::Value(value) => Outcome::Value(value),
            Outcome::Empty => Outcome::Empty,
            Outcome::Failure(error) => Outcome::Failure(error.clone()),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Value(value) => Outcome::Value(f(value)),
            Outcome::Empty => Outcome::Empty,
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    pub fn and_then<U, F: FnOnce(T) -> Outcome<U>>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Value(value) => f(value),
            Outcome::Empty => Outcome::Empty,
            Outcome::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Treat `Empty` as `None`, keep failures as errors.
    pub fn into_result(self) -> Result<Option<T>, AnalysisError> {
        match self {
            Outcome::Value(value) => Ok(Some(value)),
            Outcome::Empty => Ok(None),
            Outcome::Failure(error) => Err(error),
        }
    }
}

impl<T: Default> Outcome<T> {
    pub fn unwrap_or_default(self) -> T {
        self.value().unwrap_or_default()
    }
}

impl<T: Clone> Outcome<Arc<T>> {
    /// Detach a shared (cached) value from the session that produced it.
    pub fn cloned(&self) -> Outcome<T> {
        self.as_ref().map(|value| T::clone(value))
    }
}

impl<T> From<Result<T, AnalysisError>> for Outcome<T> {
    fn from(result: Result<T, AnalysisError>) -> Self {
        match result {
            Ok(value) => Outcome::Value(value),
            Err(error) => Outcome::Failure(error),
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(option: Option<T>) -> Self {
        option.map_or(Outcome::Empty, Outcome::Value)
    }
}
