//! Section importance heuristics shared by the summarize and selective
//! strategies.

use crate::sections::{is_fence, is_header};
use crate::tokens::estimate_tokens_precise;
use once_cell::sync::Lazy;
use regex::Regex;

static EXPORTED_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*export\s+(?:default\s+)?(?:abstract\s+)?(?:async\s+)?(?:interface|class|function|const)\b",
    )
    .expect("valid export regex")
});
static ERROR_HANDLING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:try|catch|throw|throws|finally|error|exception)\b")
        .expect("valid error regex")
});
static DOC_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\*\*|@param\b|@returns?\b|///").expect("valid doc regex"));

static PRIMARY_TERMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:main|primary|core|key)\b").expect("valid regex"));
static PUBLIC_TERMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:public|export|api)\b").expect("valid regex"));
static TEST_TERMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:test|spec|mock)\b").expect("valid regex"));
static EXAMPLE_TERMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:example|sample|demo)\b").expect("valid regex"));

const LARGE_SECTION_TOKENS: usize = 500;

/// Base importance of a section.
///
/// +10 header, +8 fenced code block, +7 exported interface/class/function/const,
/// +5 error handling, +3 documentation marker, -2 when larger than 500
/// estimated tokens.
#[must_use]
pub fn importance_score(section: &str) -> i32 {
    let mut score = 0;

    let first_line = section.lines().find(|line| !line.trim().is_empty());
    if first_line.is_some_and(is_header) {
        score += 10;
    }
    if section.lines().any(is_fence) {
        score += 8;
    }
    if EXPORTED_DECL.is_match(section) {
        score += 7;
    }
    if ERROR_HANDLING.is_match(section) {
        score += 5;
    }
    if DOC_MARKER.is_match(section) {
        score += 3;
    }
    if estimate_tokens_precise(section) > LARGE_SECTION_TOKENS {
        score -= 2;
    }

    score
}

/// Importance plus the selective-mode term boosts and penalties, floored at 0.
#[must_use]
pub fn selective_score(section: &str) -> i32 {
    let mut score = importance_score(section);

    if PRIMARY_TERMS.is_match(section) {
        score += 5;
    }
    if PUBLIC_TERMS.is_match(section) {
        score += 4;
    }
    if TEST_TERMS.is_match(section) {
        score -= 3;
    }
    if EXAMPLE_TERMS.is_match(section) {
        score -= 2;
    }

    score.max(0)
}
