use thiserror::Error;

/// Result type for optimizer operations
pub type Result<T> = std::result::Result<T, OptimizerError>;

/// Errors that can occur while optimizing or chunking content
#[derive(Error, Debug)]
pub enum OptimizerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Chunk size of zero would never make progress
    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,
}

impl OptimizerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
