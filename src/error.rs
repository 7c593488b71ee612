// Typed pipeline failures.
//
// Core algorithms return these so callers can match on the failure kind.
// The CLI and the I/O layers wrap them in anyhow with context.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A method name or parameter value that this build does not recognize.
    #[error("invalid configuration: unsupported {field} '{value}'")]
    InvalidConfiguration { field: &'static str, value: String },

    /// A chosen method needs an argument that was not supplied.
    #[error("missing dependency: {0} is required for the selected method")]
    MissingDependency(String),

    /// Not enough usable vectors to cluster or score.
    #[error("insufficient data: need at least {needed} usable vectors, found {found}")]
    InsufficientData { needed: usize, found: usize },

    /// Vectors of unequal length reached a stage that needs a fixed dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// The clustering backend itself failed.
    #[error("clustering failed: {0}")]
    Clustering(String),

    /// A parameter sweep was interrupted between candidates.
    #[error("operation cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn invalid(field: &'static str, value: impl Into<String>) -> Self {
        PipelineError::InvalidConfiguration {
            field,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
