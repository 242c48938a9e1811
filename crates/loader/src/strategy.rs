use crate::error::Result;
use async_trait::async_trait;
use context_protocol::{LoadedContext, LoadingOptions};
use std::path::Path;

/// A policy for choosing which files of a tree fit into a token budget.
///
/// Implementations never exceed `options.max_tokens` and return a (possibly
/// empty) [`LoadedContext`] for any readable root.
#[async_trait]
pub trait LoadingStrategy: Send + Sync {
    /// Registry key, e.g. `"progressive"`.
    fn name(&self) -> &str;

    async fn load_context(&self, root: &Path, options: &LoadingOptions) -> Result<LoadedContext>;
}
