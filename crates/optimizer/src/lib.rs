//! # Context Optimizer
//!
//! Fits already-loaded text into a token budget.
//!
//! ## Pipeline
//!
//! ```text
//! Content
//!     │
//!     ├──> Section splitting (headers / rules, fenced blocks atomic)
//!     │
//!     ├──> optimize_context
//!     │    ├─> summarize  (rank by importance, greedy, one short fallback)
//!     │    ├─> selective  (rank with boosts, skip what does not fit)
//!     │    └─> compress   (whitespace, duplicates, long blocks)
//!     │
//!     ├──> chunk_context  (greedy packing + trailing-line overlap)
//!     │
//!     └──> token_info     (per-category breakdown)
//! ```
//!
//! Two token estimators are exposed on purpose: [`estimate_tokens_fast`] for
//! hot loops over many candidates, [`estimate_tokens_precise`] once content is
//! in hand.
//!
//! ## Example
//!
//! ```rust
//! use context_optimizer::{ContentOptimizer, OptimizationStrategy};
//!
//! let optimizer = ContentOptimizer::default();
//! let text = "# Title\n\nSome    text\n\n\n\nSome    text\n";
//! let result = optimizer.optimize_context(text, OptimizationStrategy::Compress, None);
//! assert!(result.optimized_tokens <= result.original_tokens);
//! ```

mod chunker;
mod compress;
mod config;
mod error;
mod importance;
mod language;
mod optimizer;
mod sections;
mod token_info;
mod tokens;
mod types;

pub use chunker::chunk_context;
pub use compress::compress;
pub use config::OptimizerConfig;
pub use context_protocol::OptimizationStrategy;
pub use error::{OptimizerError, Result};
pub use importance::{importance_score, selective_score};
pub use language::Language;
pub use optimizer::{pack_selective, ContentOptimizer, ScoredSection};
pub use sections::split_sections;
pub use token_info::token_info;
pub use tokens::{estimate_tokens_fast, estimate_tokens_precise};
pub use types::{
    CategoryShare, ChunkMetadata, ContextChunk, OptimizationResult, TokenBreakdown, TokenInfo,
};
