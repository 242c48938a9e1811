use thiserror::Error;

pub type Result<T> = std::result::Result<T, RelevanceError>;

#[derive(Error, Debug)]
pub enum RelevanceError {
    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] globset::Error),
}
