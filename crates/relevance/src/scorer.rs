use crate::criteria::{ScoringCriteria, ScoringWeights};
use crate::error::Result;
use crate::factors::{
    depth_score, name_score, path_score, query_score, recency_score, size_score, type_score,
    FactorScores,
};
use context_protocol::{relative_path, FileStats, FileSystem, PathPatterns};
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Content is only scanned for query terms below this size.
const QUERY_CONTENT_LIMIT: u64 = 100 * 1024;

const FILE_TYPE_MISMATCH: f64 = 0.1;
const INCLUDE_MISS: f64 = 0.2;
const STRONG_FACTOR: f64 = 80.0;

/// A scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRelevance {
    /// Root-relative, `/`-separated.
    pub path: String,
    pub score: f64,
    pub factors: FactorScores,
    pub reason: String,
}

/// Multi-factor relevance scorer over a [`FileSystem`].
pub struct RelevanceScorer {
    fs: Arc<dyn FileSystem>,
}

impl RelevanceScorer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Score `paths` and rank them best first.
    ///
    /// Relative paths are resolved against `criteria.root`. Equal scores keep
    /// their input order. The threshold, when set, drops results after
    /// ranking. Unreadable files are still scored, with neutral size and
    /// recency factors.
    pub async fn score_files<P: AsRef<Path>>(
        &self,
        paths: &[P],
        criteria: &ScoringCriteria,
    ) -> Result<Vec<FileRelevance>> {
        let include = PathPatterns::new(&criteria.include_patterns)?;
        let exclude = PathPatterns::new(&criteria.exclude_patterns)?;
        let terms = criteria.query_terms();
        let root = criteria.root.as_deref();
        let context = criteria
            .context_path
            .as_deref()
            .map(|path| resolve(root, path).1);

        let mut ranked = Vec::with_capacity(paths.len());
        for path in paths {
            let (absolute, rel) = resolve(root, path.as_ref());
            let factors = self
                .factor_scores(&absolute, &rel, context.as_deref(), Some(terms.as_slice()))
                .await;

            let mut score = weighted_average(&factors, &criteria.weights);
            if !criteria.allows_extension(extension_of(&rel)) {
                score *= FILE_TYPE_MISMATCH;
            }
            if !include.is_empty() && !include.matches(&rel) {
                score *= INCLUDE_MISS;
            }
            if exclude.matches(&rel) {
                score = 0.0;
            }

            ranked.push(FileRelevance {
                reason: describe(&factors),
                path: rel,
                score: score.clamp(0.0, 100.0),
                factors,
            });
        }

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(threshold) = criteria.threshold {
            ranked.retain(|file| file.score >= threshold);
        }

        debug!(
            "Scored {} candidates, {} kept{}",
            paths.len(),
            ranked.len(),
            criteria
                .threshold
                .map(|t| format!(" (threshold {t})"))
                .unwrap_or_default()
        );
        Ok(ranked)
    }

    /// Static factor breakdown of a single path, without query scoring.
    pub async fn calculate_relevance(
        &self,
        path: &Path,
        context_path: Option<&Path>,
    ) -> FactorScores {
        let rel = normalize(path);
        let context = context_path.map(normalize);
        self.factor_scores(path, &rel, context.as_deref(), None)
            .await
    }

    async fn factor_scores(
        &self,
        absolute: &Path,
        rel: &str,
        context: Option<&str>,
        terms: Option<&[String]>,
    ) -> FactorScores {
        let file_name = rel.rsplit('/').next().unwrap_or(rel);
        let stats = match self.fs.stats(absolute).await {
            Ok(stats) => Some(stats),
            Err(err) => {
                debug!("Cannot stat {}: {err}", absolute.display());
                None
            }
        };

        let query = match terms {
            Some(terms) if !terms.is_empty() => {
                let content = self.query_content(absolute, stats.as_ref()).await;
                Some(query_score(terms, file_name, rel, content.as_deref()))
            }
            _ => None,
        };

        FactorScores {
            path: path_score(rel),
            name: name_score(file_name),
            file_type: type_score(file_name),
            depth: depth_score(rel, context),
            size: size_score(stats.as_ref().map(|s| s.size)),
            recency: recency_score(stats.as_ref().map(|s| age(s.modified))),
            query,
        }
    }

    async fn query_content(&self, absolute: &Path, stats: Option<&FileStats>) -> Option<String> {
        let stats = stats?;
        if stats.size >= QUERY_CONTENT_LIMIT {
            return None;
        }
        match self.fs.read_file(absolute).await {
            Ok(content) => Some(content),
            Err(err) => {
                debug!("Cannot read {} for query scoring: {err}", absolute.display());
                None
            }
        }
    }
}

fn resolve(root: Option<&Path>, path: &Path) -> (PathBuf, String) {
    match root {
        Some(root) if path.is_relative() => (root.join(path), normalize(path)),
        Some(root) => (path.to_path_buf(), relative_path(root, path)),
        None => (path.to_path_buf(), normalize(path)),
    }
}

fn normalize(path: &Path) -> String {
    relative_path(Path::new(""), path)
}

fn extension_of(rel: &str) -> Option<&str> {
    let file_name = rel.rsplit('/').next()?;
    Path::new(file_name).extension().and_then(|ext| ext.to_str())
}

fn age(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO)
}

/// Weighted average of the factors, so the result stays on the same
/// `[0, 100]` scale as each factor.
fn weighted_average(factors: &FactorScores, weights: &ScoringWeights) -> f64 {
    let mut pairs = vec![
        (factors.path, weights.path),
        (factors.name, weights.name),
        (factors.file_type, weights.file_type),
        (factors.depth, weights.depth),
        (factors.size, weights.size),
        (factors.recency, weights.recency),
    ];
    if let Some(query) = factors.query {
        pairs.push((query, weights.query));
    }

    let total_weight: f64 = pairs.iter().map(|(_, w)| w.max(0.0)).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    pairs.iter().map(|(f, w)| f * w.max(0.0)).sum::<f64>() / total_weight
}

fn describe(factors: &FactorScores) -> String {
    let mut strong: Vec<(f64, &str)> = [
        (factors.query.unwrap_or(0.0), "matches query"),
        (factors.name, "important filename"),
        (factors.path, "relevant location"),
        (factors.file_type, "preferred file type"),
        (factors.depth, "close to context"),
        (factors.size, "manageable size"),
        (factors.recency, "recently modified"),
    ]
    .into_iter()
    .filter(|(score, _)| *score >= STRONG_FACTOR)
    .collect();

    if strong.is_empty() {
        let average = (factors.path
            + factors.name
            + factors.file_type
            + factors.depth
            + factors.size
            + factors.recency)
            / 6.0;
        return match average {
            a if a >= 70.0 => "Generally relevant".to_string(),
            a if a >= 40.0 => "Moderately relevant".to_string(),
            _ => "Low relevance".to_string(),
        };
    }

    strong.sort_by(|a, b| b.0.total_cmp(&a.0));
    let labels: Vec<&str> = strong.iter().take(3).map(|(_, label)| *label).collect();
    let joined = labels.join(", ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => joined,
    }
}
