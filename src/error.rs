use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors produced while resolving configuration or generating the dataset.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Malformed or internally inconsistent configuration. Raised eagerly at
    /// configuration-resolution or metadata-sampling time; a bad config
    /// aborts the whole run.
    #[error("configuration error: {0}")]
    Config(String),

    /// A simulated quantity landed outside its valid range after clamping.
    /// Indicates a logic defect rather than a data problem; fatal.
    #[error("simulation invariant violated: {0}")]
    InvariantViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl GeneratorError {
    pub fn config(msg: impl Into<String>) -> Self {
        GeneratorError::Config(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        GeneratorError::InvariantViolation(msg.into())
    }
}
