use context_protocol::OptimizationStrategy;
use serde::{Deserialize, Serialize};

/// Outcome of a single `optimize_context` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub original_content: String,
    pub optimized_content: String,
    pub original_tokens: usize,
    pub optimized_tokens: usize,
    /// `(original - optimized) / original * 100`, zero for empty input
    pub reduction_percentage: f64,
    pub strategy: OptimizationStrategy,
}

impl OptimizationResult {
    pub(crate) fn new(
        original_content: &str,
        optimized_content: String,
        original_tokens: usize,
        optimized_tokens: usize,
        strategy: OptimizationStrategy,
    ) -> Self {
        let reduction_percentage = if original_tokens == 0 {
            0.0
        } else {
            (original_tokens as f64 - optimized_tokens as f64) / original_tokens as f64 * 100.0
        };
        Self {
            original_content: original_content.to_string(),
            optimized_content,
            original_tokens,
            optimized_tokens,
            reduction_percentage,
            strategy,
        }
    }
}

/// One packed unit of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub content: String,
    /// 0-based position in the chunk list
    pub index: usize,
    pub token_count: usize,
    pub metadata: ChunkMetadata,
}

impl ContextChunk {
    /// Content without the overlap prefix borrowed from the previous chunk
    #[must_use]
    pub fn own_content(&self) -> &str {
        if self.metadata.overlap_lines == 0 {
            return &self.content;
        }
        let mut rest = self.content.as_str();
        for _ in 0..self.metadata.overlap_lines {
            match rest.find('\n') {
                Some(pos) => rest = &rest[pos + 1..],
                None => return "",
            }
        }
        rest
    }
}

/// Metadata about a chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub has_code: bool,
    pub has_documentation: bool,
    /// Language of the first tagged fenced block, if any
    pub language: Option<String>,
    /// Lines prepended from the previous chunk
    #[serde(default)]
    pub overlap_lines: usize,
}

/// Tokens attributed to one content category
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub tokens: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenBreakdown {
    pub code: CategoryShare,
    pub comments: CategoryShare,
    pub documentation: CategoryShare,
    pub whitespace: CategoryShare,
    pub other: CategoryShare,
}

/// Per-category token report for a piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub total_tokens: usize,
    pub breakdown: TokenBreakdown,
    pub estimated_cost: f64,
    pub within_limit: bool,
}
