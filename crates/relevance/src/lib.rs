//! # Context Relevance
//!
//! Scores candidate file paths for inclusion in a context window.
//!
//! Six static factors (path, name, type, depth, size, recency) plus an optional
//! query factor are each clamped to `[0, 100]`, combined as a weighted average,
//! then adjusted by the file-type, include and exclude filters of the
//! [`ScoringCriteria`]. Ranking is a stable descending sort.
//!
//! ## Example
//!
//! ```no_run
//! use context_protocol::LocalFileSystem;
//! use context_relevance::{RelevanceScorer, ScoringCriteria};
//! use std::sync::Arc;
//!
//! # async fn run() -> context_relevance::Result<()> {
//! let scorer = RelevanceScorer::new(Arc::new(LocalFileSystem::new()));
//! let criteria = ScoringCriteria::for_root("/repo").with_query("auth token");
//! let ranked = scorer.score_files(&["src/auth/token.ts", "docs/intro.md"], &criteria).await?;
//! for file in ranked {
//!     println!("{:>5.1} {} ({})", file.score, file.path, file.reason);
//! }
//! # Ok(())
//! # }
//! ```

mod criteria;
mod error;
mod factors;
mod scorer;
mod tables;

pub use criteria::{ScoringCriteria, ScoringWeights, WeightOverrides};
pub use error::{RelevanceError, Result};
pub use factors::{
    depth_score, name_score, path_score, recency_score, size_score, type_score, FactorScores,
};
pub use scorer::{FileRelevance, RelevanceScorer};
