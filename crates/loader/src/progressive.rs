use crate::common::{
    ensure_root, join_rel, list_sorted, walk_files, BudgetedLoad, CandidateFilter, Exclusions,
};
use crate::error::{LoaderError, Result};
use crate::strategy::LoadingStrategy;
use async_trait::async_trait;
use context_protocol::{
    FileSystem, LoadedContext, LoadingOptions, ProjectAnalyzer, ProjectInfo, PROJECT_INFO_KEY,
};
use context_relevance::{RelevanceScorer, ScoringCriteria, ScoringWeights};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

pub const PROGRESSIVE: &str = "progressive";

const CORE_FILES: &[&str] = &[
    "README.md",
    "package.json",
    "tsconfig.json",
    ".env.example",
    "docker-compose.yml",
];

/// Earlier entries load first; a trailing `.` matches as a prefix.
const CONFIG_PRIORITY: &[&str] = &["package.json", "tsconfig.json", ".env", "config."];
const MAX_CONFIG_FILES: usize = 10;

const ROOT_DOCS: &[&str] = &["README.md", "CONTRIBUTING.md", "API.md", "ARCHITECTURE.md"];
const DOCS_PER_DIR: usize = 5;

const CONFIG_GATE: f64 = 0.80;
const QUERY_GATE: f64 = 0.90;
const DOCS_GATE: f64 = 0.95;

const QUERY_THRESHOLD: f64 = 40.0;
const DEFAULT_QUERY_DEPTH: usize = 10;

/// Loads in priority stages: must-have files first, then configuration,
/// query matches and finally documentation, each stage only while enough
/// budget remains.
pub struct ProgressiveStrategy {
    fs: Arc<dyn FileSystem>,
    analyzer: Arc<dyn ProjectAnalyzer>,
    scorer: RelevanceScorer,
    weights: ScoringWeights,
}

impl ProgressiveStrategy {
    pub fn new(fs: Arc<dyn FileSystem>, analyzer: Arc<dyn ProjectAnalyzer>) -> Self {
        Self {
            scorer: RelevanceScorer::new(Arc::clone(&fs)),
            fs,
            analyzer,
            weights: ScoringWeights::default(),
        }
    }

    /// Weights for the query stage.
    #[must_use]
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    async fn load_query_matches(
        &self,
        load: &mut BudgetedLoad<'_>,
        root: &Path,
        query: &str,
        options: &LoadingOptions,
        filter: &CandidateFilter,
    ) -> Result<usize> {
        let depth = options.max_depth.unwrap_or(DEFAULT_QUERY_DEPTH);
        let candidates = walk_files(self.fs.as_ref(), root, depth, filter).await;

        let mut criteria = ScoringCriteria::for_root(root)
            .with_query(query)
            .with_threshold(QUERY_THRESHOLD)
            .with_weights(self.weights)
            .with_file_types(options.file_types.iter().cloned());
        criteria.include_patterns = options.include_patterns.clone();

        let ranked = self.scorer.score_files(&candidates, &criteria).await?;
        debug!(
            "{} of {} candidates scored at least {QUERY_THRESHOLD}",
            ranked.len(),
            candidates.len()
        );
        let ranked: Vec<String> = ranked.into_iter().map(|file| file.path).collect();
        Ok(load.load_soft(ranked).await)
    }

    async fn load_docs(
        &self,
        load: &mut BudgetedLoad<'_>,
        root: &Path,
        project: &ProjectInfo,
        filter: &CandidateFilter,
    ) -> usize {
        let mut loaded = load
            .load_soft(ROOT_DOCS.iter().map(|name| name.to_string()).collect())
            .await;

        for dir in &project.structure.docs_dirs {
            let dir = dir.trim_matches('/');
            let mut files = Vec::new();
            for name in list_sorted(self.fs.as_ref(), root, dir).await {
                let rel = join_rel(dir, &name);
                if files.len() >= DOCS_PER_DIR {
                    break;
                }
                if self.fs.is_file(&root.join(&rel)).await && filter.accepts_walked(&name, &rel) {
                    files.push(rel);
                }
            }
            loaded += load.load_soft(files).await;
        }
        loaded
    }
}

/// Entry points followed by [`CORE_FILES`], scanned as one priority list.
pub(crate) fn must_have_files(project: &ProjectInfo) -> Vec<String> {
    project
        .entry_points
        .iter()
        .cloned()
        .chain(CORE_FILES.iter().map(|name| name.to_string()))
        .collect()
}

/// Config files ordered by [`CONFIG_PRIORITY`] (stable otherwise) and capped.
pub(crate) fn prioritize_config_files(files: &[String]) -> Vec<String> {
    let rank = |path: &String| {
        let name = path.rsplit('/').next().unwrap_or(path);
        CONFIG_PRIORITY
            .iter()
            .position(|wanted| {
                if wanted.ends_with('.') {
                    name.starts_with(wanted)
                } else {
                    name == *wanted
                }
            })
            .unwrap_or(CONFIG_PRIORITY.len())
    };
    let mut ordered = files.to_vec();
    ordered.sort_by_key(rank);
    ordered.truncate(MAX_CONFIG_FILES);
    ordered
}

#[async_trait]
impl LoadingStrategy for ProgressiveStrategy {
    fn name(&self) -> &str {
        PROGRESSIVE
    }

    async fn load_context(&self, root: &Path, options: &LoadingOptions) -> Result<LoadedContext> {
        let exclusions = Exclusions::new(&options.exclude_patterns)?;
        let filter = CandidateFilter::new(exclusions.clone(), &options.file_types);
        ensure_root(self.fs.as_ref(), root).await?;

        let project = self
            .analyzer
            .analyze_project(root)
            .await
            .map_err(|source| LoaderError::root(root, source))?;

        let mut load = BudgetedLoad::new(
            self.fs.as_ref(),
            root,
            options.max_tokens,
            &exclusions,
            PROGRESSIVE,
        );

        let must_have = must_have_files(&project);
        let loaded = load.load_hard(must_have).await;
        debug!("Must-have stage loaded {loaded} files");

        if load.used_fraction() < CONFIG_GATE {
            let configs = prioritize_config_files(&project.structure.config_files);
            let total = configs.len();
            let loaded = load.load_hard(configs).await;
            debug!("Config stage loaded {loaded} of {total} files");
        }

        if let Some(query) = options.query() {
            if load.used_fraction() < QUERY_GATE {
                let loaded = self
                    .load_query_matches(&mut load, root, query, options, &filter)
                    .await?;
                debug!("Query stage loaded {loaded} files");
            }
        }

        if load.used_fraction() < DOCS_GATE {
            let loaded = self.load_docs(&mut load, root, &project, &filter).await;
            debug!("Docs stage loaded {loaded} files");
        }

        load.context_mut().metadata.insert(
            PROJECT_INFO_KEY.to_string(),
            serde_json::to_value(&project).unwrap_or_default(),
        );

        let context = load.into_context();
        info!(
            "Progressive load of {}: {} files, {} / {} tokens",
            root.display(),
            context.file_count(),
            context.total_tokens,
            options.max_tokens
        );
        Ok(context)
    }
}
