//! Exclusion rules, tree walking and budgeted admission shared by every
//! strategy.

use crate::error::{LoaderError, Result};
use context_optimizer::estimate_tokens_fast;
use context_protocol::{FileSystem, LoadedContext, PathPatterns};
use log::{debug, warn};
use std::path::Path;

/// Directory names never descended into. Any dot-prefixed name is skipped too.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".svn",
    ".hg",
    "dist",
    "build",
    "coverage",
    ".cache",
    ".next",
    ".nuxt",
    ".turbo",
    "venv",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    "vendor",
    "tmp",
    "temp",
];

/// Text extensions considered when no file-type filter is given.
const TEXT_EXTENSIONS: &[&str] = &[
    // languages
    "rs", "py", "pyw", "js", "mjs", "cjs", "ts", "tsx", "jsx", "java", "kt", "kts", "go", "c",
    "h", "cpp", "cc", "cxx", "hpp", "hh", "cs", "rb", "swift", "php", "scala", "dart", "zig",
    "lua", "ex", "exs", "vue", "svelte",
    // scripts
    "sh", "bash", "zsh", "fish", "ps1",
    // docs
    "md", "mdx", "rst", "adoc", "txt",
    // config / data / infra
    "yaml", "yml", "json", "toml", "ini", "cfg", "conf", "properties", "env", "gradle", "xml",
    "html", "css", "scss", "less", "sql", "graphql", "proto", "tf", "hcl",
];

const TEXT_FILE_NAMES: &[&str] = &["Dockerfile", "Makefile", "Justfile", "Gemfile", "Procfile"];

pub(crate) fn is_ignored_dir(name: &str) -> bool {
    name.starts_with('.') || IGNORED_DIRS.iter().any(|ignored| *ignored == name)
}

pub(crate) fn join_rel(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

pub(crate) fn extension(rel: &str) -> Option<&str> {
    let name = rel.rsplit('/').next()?;
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

/// Built-in ignore rules merged with caller-supplied exclude globs.
#[derive(Clone, Debug, Default)]
pub struct Exclusions {
    patterns: PathPatterns,
}

impl Exclusions {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Ok(Self {
            patterns: PathPatterns::new(patterns)?,
        })
    }

    /// Directory `rel` (named `name`) is pruned from walks.
    pub fn skips_dir(&self, name: &str, rel: &str) -> bool {
        is_ignored_dir(name) || self.patterns.matches(rel)
    }

    /// File discovered during a walk is skipped.
    pub fn skips_walked_file(&self, name: &str, rel: &str) -> bool {
        name.starts_with('.') || self.excludes(rel)
    }

    /// Any ancestor directory is ignored, or an exclude glob matches. The file
    /// name itself may be dot-prefixed (`.env.example` is loaded by name).
    pub fn excludes(&self, rel: &str) -> bool {
        let mut segments: Vec<&str> = rel.split('/').filter(|s| !s.is_empty()).collect();
        segments.pop();
        segments.iter().any(|dir| is_ignored_dir(dir)) || self.patterns.matches(rel)
    }
}

/// Which walked files become candidates.
#[derive(Clone, Debug, Default)]
pub struct CandidateFilter {
    pub exclusions: Exclusions,
    /// Extension allowlist; empty falls back to known text extensions.
    pub file_types: Vec<String>,
}

impl CandidateFilter {
    pub fn new(exclusions: Exclusions, file_types: &[String]) -> Self {
        Self {
            exclusions,
            file_types: file_types
                .iter()
                .map(|t| t.trim().trim_start_matches('.').to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn accepts_type(&self, rel: &str) -> bool {
        let ext = extension(rel).map(str::to_lowercase);
        if !self.file_types.is_empty() {
            return ext.is_some_and(|ext| self.file_types.contains(&ext));
        }
        let name = rel.rsplit('/').next().unwrap_or(rel);
        if TEXT_FILE_NAMES.contains(&name) {
            return true;
        }
        ext.is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
    }

    pub fn accepts_walked(&self, name: &str, rel: &str) -> bool {
        !self.exclusions.skips_walked_file(name, rel) && self.accepts_type(rel)
    }
}

/// Fail with [`LoaderError::RootUnreadable`] unless `root` can be listed.
pub(crate) async fn ensure_root(fs: &dyn FileSystem, root: &Path) -> Result<Vec<String>> {
    fs.list_directory(root)
        .await
        .map_err(|source| LoaderError::root(root, source))
}

/// Sorted listing of a directory below the root. Failures are logged and
/// yield nothing.
pub(crate) async fn list_sorted(fs: &dyn FileSystem, root: &Path, rel: &str) -> Vec<String> {
    match fs.list_directory(&root.join(rel)).await {
        Ok(mut names) => {
            names.sort();
            names
        }
        Err(err) => {
            warn!("Skipping unreadable directory {rel}: {err}");
            Vec::new()
        }
    }
}

/// Depth-first walk returning root-relative candidate files in a
/// deterministic order. The root is depth 0; directories deeper than
/// `max_depth` are not entered.
pub async fn walk_files(
    fs: &dyn FileSystem,
    root: &Path,
    max_depth: usize,
    filter: &CandidateFilter,
) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![(String::new(), 0usize)];

    while let Some((dir, depth)) = stack.pop() {
        let mut subdirs = Vec::new();
        for name in list_sorted(fs, root, &dir).await {
            let rel = join_rel(&dir, &name);
            let absolute = root.join(&rel);
            if fs.is_directory(&absolute).await {
                if depth < max_depth && !filter.exclusions.skips_dir(&name, &rel) {
                    subdirs.push((rel, depth + 1));
                }
            } else if fs.is_file(&absolute).await && filter.accepts_walked(&name, &rel) {
                files.push(rel);
            }
        }
        stack.extend(subdirs.into_iter().rev());
    }

    debug!("Walk found {} candidate files", files.len());
    files
}

/// Outcome of offering one file to a [`BudgetedLoad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Loaded(usize),
    AlreadyLoaded,
    Excluded,
    Unreadable,
    TooLarge(usize),
}

/// A [`LoadedContext`] under construction with a hard token ceiling.
///
/// Admission is monotonic: a file is charged its fast estimate once and never
/// removed.
pub(crate) struct BudgetedLoad<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    max_tokens: usize,
    exclusions: &'a Exclusions,
    context: LoadedContext,
}

impl<'a> BudgetedLoad<'a> {
    pub(crate) fn new(
        fs: &'a dyn FileSystem,
        root: &'a Path,
        max_tokens: usize,
        exclusions: &'a Exclusions,
        strategy: &str,
    ) -> Self {
        Self {
            fs,
            root,
            max_tokens,
            exclusions,
            context: LoadedContext::new(strategy),
        }
    }

    pub(crate) fn used(&self) -> usize {
        self.context.total_tokens
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.used() >= self.max_tokens
    }

    pub(crate) fn used_fraction(&self) -> f64 {
        if self.max_tokens == 0 {
            return 1.0;
        }
        self.used() as f64 / self.max_tokens as f64
    }

    pub(crate) fn context(&self) -> &LoadedContext {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut LoadedContext {
        &mut self.context
    }

    pub(crate) fn into_context(self) -> LoadedContext {
        self.context
    }

    pub(crate) async fn admit(&mut self, rel: &str) -> Admission {
        if self.context.contains(rel) {
            return Admission::AlreadyLoaded;
        }
        if self.exclusions.excludes(rel) {
            return Admission::Excluded;
        }

        let content = match self.fs.read_file(&self.root.join(rel)).await {
            Ok(content) => content,
            Err(err) => {
                debug!("Skipping unreadable file {rel}: {err}");
                return Admission::Unreadable;
            }
        };

        let tokens = estimate_tokens_fast(&content);
        if self.used() + tokens > self.max_tokens {
            debug!(
                "{rel} needs {tokens} tokens, {} left",
                self.max_tokens.saturating_sub(self.used())
            );
            return Admission::TooLarge(tokens);
        }

        self.context.insert(rel, content, tokens);
        debug!("Loaded {rel} ({tokens} tokens, {} used)", self.used());
        Admission::Loaded(tokens)
    }

    /// Soft-skip: a candidate that does not fit is passed over and the scan
    /// continues. Stops once the budget is met. Returns the number loaded.
    pub(crate) async fn load_soft(&mut self, candidates: Vec<String>) -> usize {
        let mut loaded = 0;
        for rel in candidates {
            if self.exhausted() {
                break;
            }
            if let Admission::Loaded(_) = self.admit(&rel).await {
                loaded += 1;
            }
        }
        loaded
    }

    /// Hard-stop: the first candidate that does not fit ends the scan, so no
    /// lower-priority file is admitted ahead of it. Unreadable, excluded and
    /// already loaded candidates are passed over.
    pub(crate) async fn load_hard(&mut self, candidates: Vec<String>) -> usize {
        let mut loaded = 0;
        for rel in candidates {
            if self.exhausted() {
                break;
            }
            match self.admit(&rel).await {
                Admission::Loaded(_) => loaded += 1,
                Admission::TooLarge(_) => break,
                _ => {}
            }
        }
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_protocol::MemoryFileSystem;
    use pretty_assertions::assert_eq;

    fn tree() -> MemoryFileSystem {
        let mut fs = MemoryFileSystem::new();
        fs.add_file("/r/a.txt", "a".repeat(40)) // 10 tokens
            .add_file("/r/big.txt", "b".repeat(400)) // 100 tokens
            .add_file("/r/c.txt", "c".repeat(40))
            .add_unreadable_file("/r/locked.txt", 10)
            .add_file("/r/src/lib.rs", "pub fn f() {}")
            .add_file("/r/src/deep/er/x.rs", "x")
            .add_file("/r/node_modules/pkg/index.js", "x")
            .add_file("/r/.hidden/secret.md", "x")
            .add_file("/r/.env.example", "KEY=")
            .add_file("/r/image.png", "binary");
        fs
    }

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn ignored_names_and_dot_dirs() {
        assert!(is_ignored_dir("node_modules"));
        assert!(is_ignored_dir(".idea"));
        assert!(!is_ignored_dir("src"));

        let exclusions = Exclusions::new(&["*.snap"]).unwrap();
        assert!(exclusions.excludes("node_modules/a/b.js"));
        assert!(exclusions.excludes("tests/__snapshots__/x.SNAP"));
        assert!(!exclusions.excludes(".env.example"));
        assert!(exclusions.skips_walked_file(".env.example", ".env.example"));
    }

    #[test]
    fn candidate_filter_uses_allowlist_or_known_text() {
        let filter = CandidateFilter::new(Exclusions::default(), &[".RS".to_string()]);
        assert!(filter.accepts_type("src/lib.rs"));
        assert!(!filter.accepts_type("README.md"));

        let open = CandidateFilter::default();
        assert!(open.accepts_type("README.md"));
        assert!(open.accepts_type("docker/Dockerfile"));
        assert!(!open.accepts_type("logo.png"));
    }

    #[tokio::test]
    async fn walk_prunes_ignored_and_respects_depth() {
        let fs = tree();
        let root = Path::new("/r");

        let all = walk_files(&fs, root, 10, &CandidateFilter::default()).await;
        assert_eq!(
            all,
            vec!["a.txt", "big.txt", "c.txt", "locked.txt", "src/lib.rs", "src/deep/er/x.rs"]
        );

        let shallow = walk_files(&fs, root, 1, &CandidateFilter::default()).await;
        assert!(shallow.contains(&"src/lib.rs".to_string()));
        assert!(!shallow.contains(&"src/deep/er/x.rs".to_string()));
    }

    #[tokio::test]
    async fn soft_skip_continues_past_oversized_files() {
        let fs = tree();
        let exclusions = Exclusions::default();
        let mut load = BudgetedLoad::new(&fs, Path::new("/r"), 25, &exclusions, "test");

        let loaded = load
            .load_soft(owned(&["a.txt", "big.txt", "locked.txt", "c.txt"]))
            .await;
        assert_eq!(loaded, 2);
        assert_eq!(load.context().paths().collect::<Vec<_>>(), vec!["a.txt", "c.txt"]);
        assert_eq!(load.used(), 20);
    }

    #[tokio::test]
    async fn hard_stop_ends_at_first_miss() {
        let fs = tree();
        let exclusions = Exclusions::default();
        let mut load = BudgetedLoad::new(&fs, Path::new("/r"), 25, &exclusions, "test");

        let loaded = load
            .load_hard(owned(&["locked.txt", "a.txt", "big.txt", "c.txt"]))
            .await;
        assert_eq!(loaded, 1);
        assert_eq!(load.context().paths().collect::<Vec<_>>(), vec!["a.txt"]);
    }

    #[tokio::test]
    async fn duplicates_are_not_recharged() {
        let fs = tree();
        let exclusions = Exclusions::default();
        let mut load = BudgetedLoad::new(&fs, Path::new("/r"), 100, &exclusions, "test");

        assert_eq!(load.admit("a.txt").await, Admission::Loaded(10));
        assert_eq!(load.admit("a.txt").await, Admission::AlreadyLoaded);
        assert_eq!(load.used(), 10);
        assert_eq!(load.admit("node_modules/pkg/index.js").await, Admission::Excluded);
    }

    #[tokio::test]
    async fn zero_budget_loads_nothing() {
        let fs = tree();
        let exclusions = Exclusions::default();
        let mut load = BudgetedLoad::new(&fs, Path::new("/r"), 0, &exclusions, "test");
        assert_eq!(load.load_soft(owned(&["a.txt"])).await, 0);
        assert_eq!(load.used_fraction(), 1.0);
    }

    #[tokio::test]
    async fn unreadable_root_is_fatal() {
        let fs = MemoryFileSystem::new();
        let err = ensure_root(&fs, Path::new("/missing")).await.unwrap_err();
        assert!(matches!(err, LoaderError::RootUnreadable { .. }));
    }
}
