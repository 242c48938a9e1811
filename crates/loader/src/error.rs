use context_relevance::RelevanceError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("Cannot read root {}: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    #[error(transparent)]
    Relevance(#[from] RelevanceError),
}

impl LoaderError {
    pub(crate) fn root(path: &std::path::Path, source: io::Error) -> Self {
        Self::RootUnreadable {
            path: path.to_path_buf(),
            source,
        }
    }
}
