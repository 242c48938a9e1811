//! # Context Loader
//!
//! Token-budgeted loading strategies over a [`FileSystem`]:
//!
//! - [`ProgressiveStrategy`]: priority stages (entry points and core files,
//!   config, query matches, docs), each gated by how much budget is used
//! - [`FocusedStrategy`]: relevance-ranked files for a query or include globs
//! - [`BreadthFirstStrategy`]: shallow files first, level by level
//!
//! Every strategy charges the fast token estimate of each admitted file and
//! never exceeds `max_tokens`. Unreadable files and directories below the root
//! are skipped; an unreadable root is an error.
//!
//! [`MarkerAnalyzer`] is the default [`ProjectAnalyzer`].

mod analyzer;
mod breadth_first;
mod common;
mod error;
mod focused;
mod progressive;
mod strategy;

use context_protocol::{FileSystem, ProjectAnalyzer};
use context_relevance::{ScoringWeights, WeightOverrides};
use std::sync::Arc;

pub use analyzer::MarkerAnalyzer;
pub use breadth_first::{
    entry_priority, sort_entries, BreadthFirstStrategy, LevelStats, BREADTH_FIRST,
    DIRECTORY_STRUCTURE_KEY, LEVEL_STATS_KEY,
};
pub use common::{walk_files, CandidateFilter, Exclusions, IGNORED_DIRS};
pub use error::{LoaderError, Result};
pub use focused::{FocusedStrategy, FOCUSED, FOCUS_SUMMARY_KEY};
pub use progressive::{ProgressiveStrategy, PROGRESSIVE};
pub use strategy::LoadingStrategy;

/// The three built-in strategies sharing one file system and analyzer.
/// `overrides` is applied on top of each scoring strategy's own profile.
pub fn builtin_strategies(
    fs: Arc<dyn FileSystem>,
    analyzer: Arc<dyn ProjectAnalyzer>,
    overrides: WeightOverrides,
) -> Vec<Arc<dyn LoadingStrategy>> {
    vec![
        Arc::new(
            ProgressiveStrategy::new(Arc::clone(&fs), analyzer)
                .with_weights(overrides.apply(ScoringWeights::default())),
        ),
        Arc::new(
            FocusedStrategy::new(Arc::clone(&fs))
                .with_weights(overrides.apply(ScoringWeights::focused())),
        ),
        Arc::new(BreadthFirstStrategy::new(fs)),
    ]
}
