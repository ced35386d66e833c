//! Application layer: wiring domain models, settings and the evaluator

pub mod error;
pub mod report;

pub use error::{ApplicationError, ApplicationResult};
pub use report::{ModelReport, ReportService};
