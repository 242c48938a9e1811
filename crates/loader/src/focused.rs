use crate::common::{ensure_root, walk_files, BudgetedLoad, CandidateFilter, Exclusions};
use crate::error::{LoaderError, Result};
use crate::strategy::LoadingStrategy;
use async_trait::async_trait;
use context_protocol::{FileSystem, LoadedContext, LoadingOptions, PathPatterns};
use context_relevance::{FileRelevance, RelevanceScorer, ScoringCriteria, ScoringWeights};
use log::{debug, info};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

pub const FOCUSED: &str = "focused";
pub const FOCUS_SUMMARY_KEY: &str = "focus_summary";

const DEFAULT_MAX_DEPTH: usize = 10;
const INCLUDE_BOOST: f64 = 1.5;
const MIN_SCORE: f64 = 30.0;

/// Loads only what a query or include patterns point at, best match first.
pub struct FocusedStrategy {
    fs: Arc<dyn FileSystem>,
    scorer: RelevanceScorer,
    weights: ScoringWeights,
}

impl FocusedStrategy {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            scorer: RelevanceScorer::new(Arc::clone(&fs)),
            fs,
            weights: ScoringWeights::focused(),
        }
    }

    /// Replace the [`ScoringWeights::focused`] profile.
    #[must_use]
    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }
}

/// Multiply by [`INCLUDE_BOOST`] once per matching include pattern, drop
/// anything under [`MIN_SCORE`], and re-rank (stable).
fn boost_and_rank(mut scored: Vec<FileRelevance>, include: &PathPatterns) -> Vec<FileRelevance> {
    for file in &mut scored {
        let matches = include.match_count(&file.path);
        if matches > 0 {
            file.score = (file.score * INCLUDE_BOOST.powi(matches as i32)).min(100.0);
        }
    }
    scored.retain(|file| file.score >= MIN_SCORE);
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored
}

#[async_trait]
impl LoadingStrategy for FocusedStrategy {
    fn name(&self) -> &str {
        FOCUSED
    }

    async fn load_context(&self, root: &Path, options: &LoadingOptions) -> Result<LoadedContext> {
        let query = options.query();
        if query.is_none() && options.include_patterns.is_empty() {
            return Err(LoaderError::Configuration(
                "focused loading requires a query or at least one include pattern".to_string(),
            ));
        }
        let include = PathPatterns::new(&options.include_patterns)?;
        let exclusions = Exclusions::new(&options.exclude_patterns)?;
        let filter = CandidateFilter::new(exclusions.clone(), &options.file_types);

        ensure_root(self.fs.as_ref(), root).await?;
        let depth = options.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        let candidates = walk_files(self.fs.as_ref(), root, depth, &filter).await;

        let mut criteria = ScoringCriteria::for_root(root)
            .with_weights(self.weights)
            .with_file_types(options.file_types.iter().cloned());
        criteria.query = query.map(str::to_string);

        let scored = self.scorer.score_files(&candidates, &criteria).await?;
        let ranked = boost_and_rank(scored, &include);
        debug!(
            "{} of {} candidates ranked for focused load",
            ranked.len(),
            candidates.len()
        );

        let mut load = BudgetedLoad::new(
            self.fs.as_ref(),
            root,
            options.max_tokens,
            &exclusions,
            FOCUSED,
        );
        let loaded = load
            .load_soft(ranked.iter().map(|file| file.path.clone()).collect())
            .await;

        let loaded_scores: Vec<f64> = ranked
            .iter()
            .filter(|file| load.context().contains(&file.path))
            .map(|file| file.score)
            .collect();
        let average_score = if loaded_scores.is_empty() {
            0.0
        } else {
            loaded_scores.iter().sum::<f64>() / loaded_scores.len() as f64
        };

        load.context_mut().metadata.insert(
            FOCUS_SUMMARY_KEY.to_string(),
            json!({
                "query": query,
                "include_patterns": options.include_patterns,
                "candidates": candidates.len(),
                "loaded": loaded,
                "average_score": average_score,
            }),
        );

        let context = load.into_context();
        info!(
            "Focused load of {}: {} files from {} candidates, {} tokens",
            root.display(),
            context.file_count(),
            candidates.len(),
            context.total_tokens
        );
        Ok(context)
    }
}
