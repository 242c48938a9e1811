//! Individual relevance factors. Every function returns a value in `[0, 100]`.

use crate::tables::{extension_score, keyword_weight, ENTRY_STEMS, SOURCE_ROOTS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const BASE: f64 = 50.0;
const KB: u64 = 1024;
const DAY_SECS: u64 = 86_400;

/// Per-factor breakdown of a relevance score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub path: f64,
    pub name: f64,
    pub file_type: f64,
    pub depth: f64,
    pub size: f64,
    pub recency: f64,
    /// Present only when the criteria carried a query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<f64>,
}

fn clamp(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

fn dir_segments(rel_path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = rel_path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments
}

/// Keyword weights of every directory segment, a bonus under `src`/`lib`, and
/// a penalty for nesting deeper than four directories.
#[must_use]
pub fn path_score(rel_path: &str) -> f64 {
    let dirs = dir_segments(rel_path);
    let mut score = BASE;

    for dir in &dirs {
        score += keyword_weight(dir);
    }
    if dirs
        .iter()
        .any(|dir| SOURCE_ROOTS.iter().any(|root| dir.eq_ignore_ascii_case(root)))
    {
        score += 10.0;
    }
    if dirs.len() > 4 {
        score -= 2.0 * (dirs.len() - 4) as f64;
    }

    clamp(score)
}

fn stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

#[must_use]
pub fn name_score(file_name: &str) -> f64 {
    let stem = stem(file_name);
    let lowered = stem.to_lowercase();
    let mut score = BASE;

    if ENTRY_STEMS.contains(&lowered.as_str()) {
        score += 30.0;
    }
    score += keyword_weight(&lowered);
    if lowered.contains("test") || lowered.contains("spec") {
        score -= 20.0;
    }
    if file_name.chars().count() > 50 {
        score -= 10.0;
    }

    clamp(score)
}

#[must_use]
pub fn type_score(file_name: &str) -> f64 {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(extension_score)
        .unwrap_or(30.0)
}

/// Nesting score. With a context directory the distance (up plus down) from it
/// is used; otherwise the absolute directory depth.
#[must_use]
pub fn depth_score(rel_path: &str, context_dir: Option<&str>) -> f64 {
    let dirs = dir_segments(rel_path);

    let Some(context_dir) = context_dir else {
        let depth = dirs.len();
        return match depth {
            0..=3 => 90.0,
            4..=5 => 70.0,
            6..=7 => 50.0,
            _ => clamp(100.0 - depth as f64 * 5.0),
        };
    };

    let context: Vec<&str> = context_dir.split('/').filter(|s| !s.is_empty()).collect();
    let common = dirs
        .iter()
        .zip(context.iter())
        .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
        .count();
    let relative = (dirs.len() - common) + (context.len() - common);

    match relative {
        0 => 100.0,
        1 => 90.0,
        2 => 70.0,
        n => clamp(100.0 - n as f64 * 10.0),
    }
}

/// Peak for 1–50 KB files; `None` (unreadable) scores neutral 50.
#[must_use]
pub fn size_score(size: Option<u64>) -> f64 {
    let Some(size) = size else {
        return 50.0;
    };
    match size {
        s if s < KB => 20.0,
        s if s <= 50 * KB => 100.0,
        s if s <= 200 * KB => 80.0,
        s if s <= 500 * KB => 60.0,
        s if s <= 1024 * KB => 40.0,
        _ => 20.0,
    }
}

/// Newer is better; `None` (unreadable) scores neutral 50.
#[must_use]
pub fn recency_score(age: Option<Duration>) -> f64 {
    let Some(age) = age else {
        return 50.0;
    };
    let days = age.as_secs() / DAY_SECS;
    match days {
        0 => 100.0,
        1..=6 => 90.0,
        7..=29 => 70.0,
        30..=89 => 50.0,
        90..=364 => 30.0,
        _ => 10.0,
    }
}

/// +20 per term in the file name, +10 per term in the path, and up to +30 per
/// term for occurrences in `content` (two points each). Capped at 100.
pub(crate) fn query_score(
    terms: &[String],
    file_name: &str,
    rel_path: &str,
    content: Option<&str>,
) -> f64 {
    let file_name = file_name.to_lowercase();
    let rel_path = rel_path.to_lowercase();
    let content = content.map(str::to_lowercase);
    let mut score = 0.0;

    for term in terms {
        if file_name.contains(term.as_str()) {
            score += 20.0;
        }
        if rel_path.contains(term.as_str()) {
            score += 10.0;
        }
        if let Some(content) = &content {
            let hits = content.matches(term.as_str()).count();
            score += (hits as f64 * 2.0).min(30.0);
        }
    }

    clamp(score)
}
