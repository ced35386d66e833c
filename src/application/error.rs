//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::domain::DomainError;

/// Application errors wrap domain and analysis errors and add setup concerns.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("worker pool setup failed: {context}")]
    WorkerPool {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
