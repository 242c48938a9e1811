use crate::config::OptimizerConfig;
use crate::sections::{is_fence, is_header, split_sections};
use crate::tokens::estimate_tokens_precise;
use crate::types::{CategoryShare, TokenBreakdown, TokenInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Code,
    Comments,
    Documentation,
    Whitespace,
    Other,
}

fn classify(section: &str) -> Category {
    let Some(first) = section.lines().find(|line| !line.trim().is_empty()) else {
        return Category::Whitespace;
    };

    if is_fence(first) || first.starts_with("    ") || first.starts_with('\t') {
        return Category::Code;
    }

    let trimmed = first.trim_start();
    if is_header(trimmed) {
        return Category::Documentation;
    }
    if trimmed.starts_with("//") || trimmed.starts_with("/*") || trimmed.starts_with('#') {
        return Category::Comments;
    }
    if trimmed.starts_with('*')
        || trimmed.starts_with('>')
        || trimmed.starts_with("@param")
        || trimmed.starts_with("@returns")
    {
        return Category::Documentation;
    }
    Category::Other
}

/// Break `content` down by category. Percentages are of the summed section
/// estimates; empty content reports zero everywhere.
#[must_use]
pub fn token_info(content: &str, config: &OptimizerConfig) -> TokenInfo {
    let mut code = 0usize;
    let mut comments = 0usize;
    let mut documentation = 0usize;
    let mut whitespace = 0usize;
    let mut other = 0usize;

    for section in split_sections(content) {
        let tokens = estimate_tokens_precise(&section);
        match classify(&section) {
            Category::Code => code += tokens,
            Category::Comments => comments += tokens,
            Category::Documentation => documentation += tokens,
            Category::Whitespace => whitespace += tokens,
            Category::Other => other += tokens,
        }
    }

    let total_tokens = code + comments + documentation + whitespace + other;
    let share = |tokens: usize| CategoryShare {
        tokens,
        percentage: if total_tokens == 0 {
            0.0
        } else {
            tokens as f64 / total_tokens as f64 * 100.0
        },
    };

    TokenInfo {
        total_tokens,
        breakdown: TokenBreakdown {
            code: share(code),
            comments: share(comments),
            documentation: share(documentation),
            whitespace: share(whitespace),
            other: share(other),
        },
        estimated_cost: total_tokens as f64 / 1_000.0 * config.cost_per_1k_tokens,
        within_limit: total_tokens <= config.token_limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_content_reports_all_zero() {
        let info = token_info("", &OptimizerConfig::default());
        assert_eq!(info.total_tokens, 0);
        assert_eq!(info.breakdown, TokenBreakdown::default());
        assert_eq!(info.estimated_cost, 0.0);
        assert!(info.within_limit);
    }

    #[test]
    fn whitespace_only_content_is_zero_not_nan() {
        let info = token_info("   \n\n\t", &OptimizerConfig::default());
        assert_eq!(info.total_tokens, 0);
        assert_eq!(info.breakdown.whitespace.percentage, 0.0);
    }

    #[test]
    fn classifies_sections() {
        assert_eq!(classify("```rs\nx\n```"), Category::Code);
        assert_eq!(classify("    indented()"), Category::Code);
        assert_eq!(classify("// note"), Category::Comments);
        assert_eq!(classify("#!/bin/sh"), Category::Comments);
        assert_eq!(classify("# Title\nbody"), Category::Documentation);
        assert_eq!(classify("> quoted"), Category::Documentation);
        assert_eq!(classify("@param x the x"), Category::Documentation);
        assert_eq!(classify("\n  \n"), Category::Whitespace);
        assert_eq!(classify("plain words"), Category::Other);
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let text = "intro words here\n# Docs\nsome docs\n---\n```\ncode();\n```";
        let info = token_info(text, &OptimizerConfig::default());
        let b = info.breakdown;
        let sum = b.code.percentage
            + b.comments.percentage
            + b.documentation.percentage
            + b.whitespace.percentage
            + b.other.percentage;
        assert!((sum - 100.0).abs() < 1e-9);
        assert!(b.documentation.tokens > 0);
        assert!(b.other.tokens > 0);
    }

    #[test]
    fn flags_content_over_the_limit() {
        let config = OptimizerConfig {
            token_limit: 3,
            ..Default::default()
        };
        let info = token_info("a b c d e", &config);
        assert_eq!(info.total_tokens, 5);
        assert!(!info.within_limit);
        assert!((info.estimated_cost - 5.0 / 1_000.0 * 0.002).abs() < 1e-12);
    }
}
