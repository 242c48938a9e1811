use context_loader::{
    builtin_strategies, LoaderError, LoadingStrategy, MarkerAnalyzer, Result, FOCUSED,
};
use context_optimizer::{estimate_tokens_precise, ContentOptimizer};
use context_protocol::{
    Context, FileSystem, LoadedContext, LoadedFile, LoadingOptions, LocalFileSystem,
    ProjectAnalyzer, ProjectInfo,
};
use context_relevance::WeightOverrides;
use log::{debug, info};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Marker prefixed to every file when loaded files are streamed through the
/// optimizer.
pub const FILE_MARKER: &str = "// File: ";

/// Name given to optimized text that cannot be attributed to a file.
pub const SYNTHETIC_FILE: &str = "optimized-context";

pub const OPTIMIZATION_KEY: &str = "optimization";

/// Entry point of the pipeline: picks a strategy by name, loads, summarizes
/// and optionally optimizes.
pub struct ContextAggregator {
    analyzer: Arc<dyn ProjectAnalyzer>,
    optimizer: ContentOptimizer,
    strategies: HashMap<String, Arc<dyn LoadingStrategy>>,
}

impl ContextAggregator {
    /// Aggregator with the built-in strategies registered.
    pub fn new(
        fs: Arc<dyn FileSystem>,
        analyzer: Arc<dyn ProjectAnalyzer>,
        optimizer: ContentOptimizer,
    ) -> Self {
        Self::with_weight_overrides(fs, analyzer, optimizer, WeightOverrides::default())
    }

    /// Like [`ContextAggregator::new`], with `overrides` applied to the
    /// scoring weights of the built-in strategies.
    pub fn with_weight_overrides(
        fs: Arc<dyn FileSystem>,
        analyzer: Arc<dyn ProjectAnalyzer>,
        optimizer: ContentOptimizer,
        overrides: WeightOverrides,
    ) -> Self {
        let mut aggregator = Self {
            analyzer: Arc::clone(&analyzer),
            optimizer,
            strategies: HashMap::new(),
        };
        for strategy in builtin_strategies(fs, analyzer, overrides) {
            aggregator.register_strategy(strategy);
        }
        aggregator
    }

    /// Local disk and marker-file analysis.
    pub fn local(optimizer: ContentOptimizer, overrides: WeightOverrides) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
        let analyzer = Arc::new(MarkerAnalyzer::new(Arc::clone(&fs)));
        Self::with_weight_overrides(fs, analyzer, optimizer, overrides)
    }

    /// Register (or replace) a strategy under its own name. Returns the
    /// strategy previously registered under that name.
    pub fn register_strategy(
        &mut self,
        strategy: Arc<dyn LoadingStrategy>,
    ) -> Option<Arc<dyn LoadingStrategy>> {
        let name = strategy.name().to_string();
        debug!("Registering strategy {name}");
        self.strategies.insert(name, strategy)
    }

    /// Registered names, sorted.
    pub fn strategy_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn strategy(&self, name: &str) -> Result<Arc<dyn LoadingStrategy>> {
        self.strategies
            .get(name)
            .cloned()
            .ok_or_else(|| LoaderError::UnknownStrategy(name.to_string()))
    }

    pub fn optimizer(&self) -> &ContentOptimizer {
        &self.optimizer
    }

    pub async fn aggregate(&self, root: &Path, options: &LoadingOptions) -> Result<Context> {
        let strategy = self.strategy(&options.strategy)?;
        let loaded = strategy.load_context(root, options).await?;

        let project_info = match loaded.project_info() {
            Some(info) => info,
            None => self
                .analyzer
                .analyze_project(root)
                .await
                .map_err(|source| LoaderError::RootUnreadable {
                    path: root.to_path_buf(),
                    source,
                })?,
        };

        let summary = build_summary(&project_info, &loaded, options);
        let LoadedContext {
            files,
            metadata,
            total_tokens,
            ..
        } = loaded;
        let mut context = Context {
            root_path: root.to_path_buf(),
            files,
            metadata,
            project_info,
            summary,
            total_tokens,
            optimized: None,
        };

        if options.optimize {
            context.optimized = Some(Box::new(self.optimize(&context, options)));
        }

        info!(
            "Aggregated {} with {}: {} files, {} tokens",
            root.display(),
            options.strategy,
            context.file_count(),
            context.total_tokens
        );
        Ok(context)
    }

    fn optimize(&self, context: &Context, options: &LoadingOptions) -> Context {
        let stream = join_tagged(&context.files);
        let result = self.optimizer.optimize_context(
            &stream,
            options.optimization_strategy,
            Some(options.max_tokens),
        );
        let files = split_tagged(&result.optimized_content);
        let total_tokens = files.iter().map(|file| file.tokens).sum();

        let mut metadata = context.metadata.clone();
        metadata.insert(
            OPTIMIZATION_KEY.to_string(),
            json!({
                "strategy": result.strategy,
                "original_tokens": result.original_tokens,
                "optimized_tokens": result.optimized_tokens,
                "reduction_percentage": result.reduction_percentage,
            }),
        );

        Context {
            root_path: context.root_path.clone(),
            summary: format!(
                "{}\nOptimized ({}): {} -> {} tokens ({:.1}% reduction)",
                context.summary,
                result.strategy,
                result.original_tokens,
                result.optimized_tokens,
                result.reduction_percentage
            ),
            files,
            metadata,
            project_info: context.project_info.clone(),
            total_tokens,
            optimized: None,
        }
    }
}

/// Human-readable overview of one aggregate.
pub fn build_summary(
    project: &ProjectInfo,
    loaded: &LoadedContext,
    options: &LoadingOptions,
) -> String {
    let mut lines = Vec::new();
    match &project.framework {
        Some(framework) => lines.push(format!("Project: {} ({framework})", project.project_type)),
        None => lines.push(format!("Project: {}", project.project_type)),
    }
    if !project.languages.is_empty() {
        lines.push(format!("Languages: {}", project.languages.join(", ")));
    }
    lines.push(format!(
        "Files: {} ({} tokens)",
        loaded.file_count(),
        loaded.total_tokens
    ));
    lines.push(format!("Strategy: {}", loaded.strategy));
    if loaded.strategy == FOCUSED {
        if let Some(query) = options.query() {
            lines.push(format!("Query: {query}"));
        }
    }
    lines.join("\n")
}

/// Serialize files as one stream, each introduced by [`FILE_MARKER`].
pub fn join_tagged(files: &[LoadedFile]) -> String {
    files
        .iter()
        .map(|file| format!("{FILE_MARKER}{}\n{}", file.path, file.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Inverse of [`join_tagged`] over optimized text. Text outside any marker
/// (or all of it, when no marker survived) goes to [`SYNTHETIC_FILE`]; a path
/// seen twice is merged in order.
pub fn split_tagged(stream: &str) -> Vec<LoadedFile> {
    let mut parts: Vec<(String, Vec<&str>)> = Vec::new();
    let mut current: Option<usize> = None;
    let mut loose: Vec<&str> = Vec::new();

    for line in stream.lines() {
        if let Some(path) = line.strip_prefix(FILE_MARKER) {
            let path = path.trim().to_string();
            let index = match parts.iter().position(|(existing, _)| *existing == path) {
                Some(index) => {
                    parts[index].1.push("");
                    index
                }
                None => {
                    parts.push((path, Vec::new()));
                    parts.len() - 1
                }
            };
            current = Some(index);
            continue;
        }
        match current {
            Some(index) => parts[index].1.push(line),
            None => loose.push(line),
        }
    }

    let mut files = Vec::with_capacity(parts.len() + 1);
    let loose = loose.join("\n");
    if !loose.trim().is_empty() {
        files.push(loaded_file(SYNTHETIC_FILE.to_string(), loose.trim().to_string()));
    }
    for (path, lines) in parts {
        let content = lines.join("\n").trim().to_string();
        files.push(loaded_file(path, content));
    }
    files
}

fn loaded_file(path: String, content: String) -> LoadedFile {
    LoadedFile {
        tokens: estimate_tokens_precise(&content),
        path,
        content,
    }
}
