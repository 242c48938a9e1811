//! # Context Protocol
//!
//! Data model shared by every stage of the context-loading pipeline, plus the
//! contracts of the collaborators the pipeline consumes but does not own:
//!
//! - [`FileSystem`]: read/stat/list primitives (never mutating)
//! - [`ProjectAnalyzer`]: project type, framework, structure and entry points
//!
//! Paths stored in [`LoadedContext`] and [`Context`] are relative to the loaded
//! root and always use `/` as separator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub mod fs;
pub mod memory_fs;
pub mod path_filters;
pub mod project;

pub use fs::{FileStats, FileSystem, LocalFileSystem};
pub use memory_fs::MemoryFileSystem;
pub use path_filters::PathPatterns;
pub use project::{ProjectAnalyzer, ProjectInfo, ProjectStructure};

pub const DEFAULT_MAX_TOKENS: usize = 50_000;
pub const DEFAULT_STRATEGY: &str = "progressive";

/// Metadata key under which strategies publish the analyzer output they used.
pub const PROJECT_INFO_KEY: &str = "project_info";

/// How the aggregator post-processes loaded text when optimization is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStrategy {
    #[default]
    Summarize,
    Selective,
    Compress,
}

impl OptimizationStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Selective => "selective",
            Self::Compress => "compress",
        }
    }
}

impl std::fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call loading configuration. Immutable for the duration of a call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadingOptions {
    pub strategy: String,
    pub max_tokens: usize,
    /// Strategy default applies when unset.
    pub max_depth: Option<usize>,
    pub query: Option<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Extension allowlist (`ts`, `.rs`, ...); empty means no filter.
    pub file_types: Vec<String>,
    pub optimize: bool,
    pub optimization_strategy: OptimizationStrategy,
}

impl Default for LoadingOptions {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_depth: None,
            query: None,
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            file_types: Vec::new(),
            optimize: false,
            optimization_strategy: OptimizationStrategy::default(),
        }
    }
}

impl LoadingOptions {
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = strategy.into();
        self
    }

    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Query with surrounding whitespace removed, `None` when blank.
    pub fn query(&self) -> Option<&str> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// One admitted file. `tokens` is the estimate charged at admission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedFile {
    pub path: String,
    pub content: String,
    pub tokens: usize,
}

/// Output of a single strategy run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadedContext {
    /// Insertion order is load order.
    pub files: Vec<LoadedFile>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub total_tokens: usize,
    pub strategy: String,
}

impl LoadedContext {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            strategy: strategy.into(),
            ..Default::default()
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|file| file.path == path)
    }

    pub fn get(&self, path: &str) -> Option<&LoadedFile> {
        self.files.iter().find(|file| file.path == path)
    }

    /// Record an admitted file and charge its tokens. Returns `false` (and
    /// charges nothing) when the path was already loaded.
    pub fn insert(&mut self, path: impl Into<String>, content: String, tokens: usize) -> bool {
        let path = path.into();
        if self.contains(&path) {
            return false;
        }
        self.total_tokens += tokens;
        self.files.push(LoadedFile {
            path,
            content,
            tokens,
        });
        true
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|file| file.path.as_str())
    }

    /// Project info a strategy already computed, if it published one.
    pub fn project_info(&self) -> Option<ProjectInfo> {
        let value = self.metadata.get(PROJECT_INFO_KEY)?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Final aggregate handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub root_path: PathBuf,
    pub files: Vec<LoadedFile>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub project_info: ProjectInfo,
    pub summary: String,
    pub total_tokens: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized: Option<Box<Context>>,
}

impl Context {
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn get(&self, path: &str) -> Option<&LoadedFile> {
        self.files.iter().find(|file| file.path == path)
    }
}

/// Root-relative, `/`-separated rendering of `path`. Paths outside `root` are
/// returned unchanged (with separators normalized).
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut out = String::new();
    for component in rel.components() {
        if let std::path::Component::Normal(name) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&name.to_string_lossy());
        }
    }
    out
}
