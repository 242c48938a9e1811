use crate::chunker::chunk_context;
use crate::compress::compress;
use crate::config::OptimizerConfig;
use crate::error::{OptimizerError, Result};
use crate::importance::{importance_score, selective_score};
use crate::sections::{is_fence, split_sections};
use crate::token_info::token_info;
use crate::tokens::estimate_tokens_precise;
use crate::types::{ContextChunk, OptimizationResult, TokenInfo};
use context_protocol::OptimizationStrategy;

const SECTION_SEPARATOR: &str = "\n\n";
const SUMMARY_LINE_CHARS: usize = 100;
const CODE_SUMMARY_CHARS: usize = 50;

/// A section with its cost and rank, as seen by the packing routines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredSection {
    pub content: String,
    pub tokens: usize,
    pub score: i32,
}

/// Main optimizer interface
#[derive(Debug, Clone, Default)]
pub struct ContentOptimizer {
    config: OptimizerConfig,
}

impl ContentOptimizer {
    /// Create an optimizer with a validated configuration
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        config.validate().map_err(OptimizerError::invalid_config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Fit `content` into `max_tokens` (config default when `None`) using
    /// `strategy`. Compression does not consult the budget.
    pub fn optimize_context(
        &self,
        content: &str,
        strategy: OptimizationStrategy,
        max_tokens: Option<usize>,
    ) -> OptimizationResult {
        let budget = max_tokens.unwrap_or(self.config.default_max_tokens);
        let original_tokens = estimate_tokens_precise(content);

        let optimized = match strategy {
            OptimizationStrategy::Summarize => summarize(content, budget),
            OptimizationStrategy::Selective => selective(content, budget),
            OptimizationStrategy::Compress => compress(content),
        };
        let optimized_tokens = estimate_tokens_precise(&optimized);

        log::debug!(
            "optimize[{strategy}]: {original_tokens} -> {optimized_tokens} tokens (budget {budget})"
        );

        OptimizationResult::new(
            content,
            optimized,
            original_tokens,
            optimized_tokens,
            strategy,
        )
    }

    /// Split `content` into chunks of at most `max_chunk_size` estimated
    /// tokens (config default when `None`), plus overlap.
    pub fn chunk_context(
        &self,
        content: &str,
        max_chunk_size: Option<usize>,
    ) -> Result<Vec<ContextChunk>> {
        let size = max_chunk_size.unwrap_or(self.config.default_chunk_size);
        if size == 0 {
            return Err(OptimizerError::InvalidChunkSize);
        }
        Ok(chunk_context(content, size, &self.config))
    }

    pub fn token_info(&self, content: &str) -> TokenInfo {
        token_info(content, &self.config)
    }
}

fn rank_sections(content: &str, score: fn(&str) -> i32) -> Vec<ScoredSection> {
    let mut ranked: Vec<ScoredSection> = split_sections(content)
        .into_iter()
        .map(|section| ScoredSection {
            tokens: estimate_tokens_precise(&section),
            score: score(&section),
            content: section,
        })
        .collect();
    // stable: equal scores keep document order
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

fn summarize(content: &str, budget: usize) -> String {
    let ranked = rank_sections(content, importance_score);
    let mut used = 0usize;
    let mut parts: Vec<String> = Vec::new();

    for section in ranked {
        if used + section.tokens <= budget {
            used += section.tokens;
            parts.push(section.content);
            continue;
        }

        let short = short_summary(&section.content);
        let short_tokens = estimate_tokens_precise(&short);
        if used + short_tokens <= budget {
            parts.push(short);
        }
        break;
    }

    parts.join(SECTION_SEPARATOR)
}

fn selective(content: &str, budget: usize) -> String {
    pack_selective(rank_sections(content, selective_score), budget)
        .into_iter()
        .map(|section| section.content)
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// Admit already-ranked sections in order, skipping (not stopping at) any that
/// would overflow the remaining budget.
#[must_use]
pub fn pack_selective(ranked: Vec<ScoredSection>, budget: usize) -> Vec<ScoredSection> {
    let mut remaining = budget;
    let mut selected = Vec::new();
    for section in ranked {
        if section.tokens <= remaining {
            remaining -= section.tokens;
            selected.push(section);
        }
    }
    selected
}

fn short_summary(section: &str) -> String {
    let mut lines = section.lines().filter(|line| !line.trim().is_empty());
    let Some(first) = lines.next() else {
        return String::new();
    };

    if is_fence(first) {
        let body = section
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !is_fence(line))
            .unwrap_or("");
        return format!(
            "[Code block: {}...]",
            truncate_chars(body, CODE_SUMMARY_CHARS)
        );
    }

    let first = first.trim();
    if first.chars().count() > SUMMARY_LINE_CHARS {
        format!("{}...", truncate_chars(first, SUMMARY_LINE_CHARS))
    } else {
        first.to_string()
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
