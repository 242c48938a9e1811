use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-factor weights of the final weighted average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub path: f64,
    pub name: f64,
    pub file_type: f64,
    pub depth: f64,
    pub size: f64,
    pub recency: f64,
    /// Only applied when a query is present.
    pub query: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            path: 1.5,
            name: 2.0,
            file_type: 1.2,
            depth: 0.8,
            size: 0.5,
            recency: 0.7,
            query: 2.5,
        }
    }
}

impl ScoringWeights {
    /// Profile for targeted loading: query, name and path dominate while
    /// depth, size and recency barely matter.
    pub fn focused() -> Self {
        Self {
            path: 2.0,
            name: 2.5,
            file_type: 1.0,
            depth: 0.3,
            size: 0.2,
            recency: 0.2,
            query: 3.5,
        }
    }
}

/// Partial [`ScoringWeights`]: each set field replaces the matching weight of
/// whatever profile it is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightOverrides {
    pub path: Option<f64>,
    pub name: Option<f64>,
    pub file_type: Option<f64>,
    pub depth: Option<f64>,
    pub size: Option<f64>,
    pub recency: Option<f64>,
    pub query: Option<f64>,
}

impl WeightOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn apply(&self, base: ScoringWeights) -> ScoringWeights {
        ScoringWeights {
            path: self.path.unwrap_or(base.path),
            name: self.name.unwrap_or(base.name),
            file_type: self.file_type.unwrap_or(base.file_type),
            depth: self.depth.unwrap_or(base.depth),
            size: self.size.unwrap_or(base.size),
            recency: self.recency.unwrap_or(base.recency),
            query: self.query.unwrap_or(base.query),
        }
    }
}

/// Configuration for one scoring batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringCriteria {
    pub query: Option<String>,
    /// Root that relative candidate paths are resolved against.
    pub root: Option<PathBuf>,
    /// Directory depth is measured from here when set.
    pub context_path: Option<PathBuf>,
    pub file_types: Vec<String>,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Results scoring below this are dropped.
    pub threshold: Option<f64>,
    pub weights: ScoringWeights,
}

impl ScoringCriteria {
    pub fn for_root(root: impl AsRef<Path>) -> Self {
        Self {
            root: Some(root.as_ref().to_path_buf()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    #[must_use]
    pub const fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub fn with_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types = types.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_context_path(mut self, path: impl AsRef<Path>) -> Self {
        self.context_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Lowercased query terms longer than two characters.
    pub fn query_terms(&self) -> Vec<String> {
        self.query
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .filter(|term| term.chars().count() > 2)
            .map(str::to_lowercase)
            .collect()
    }

    pub(crate) fn allows_extension(&self, ext: Option<&str>) -> bool {
        if self.file_types.is_empty() {
            return true;
        }
        let Some(ext) = ext else {
            return false;
        };
        self.file_types
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}
