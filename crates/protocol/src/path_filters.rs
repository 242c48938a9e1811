//! Case-insensitive glob matching for include/exclude filters.
//!
//! Patterns support `*`, `?`, `[...]` and `**`. A pattern without `/` is
//! matched against every path segment (so `*.log` and `fixtures` behave like
//! ignore-file entries); a pattern with `/` is matched against the whole
//! root-relative path.

use globset::{GlobBuilder, GlobMatcher};

#[derive(Clone, Debug)]
struct PathPattern {
    raw: String,
    matcher: GlobMatcher,
    segment_only: bool,
}

impl PathPattern {
    fn matches(&self, rel_path: &str) -> bool {
        if self.matcher.is_match(rel_path) {
            return true;
        }
        self.segment_only
            && rel_path
                .split('/')
                .filter(|segment| !segment.is_empty())
                .any(|segment| self.matcher.is_match(segment))
    }
}

/// Compiled set of user-supplied glob patterns.
#[derive(Clone, Debug, Default)]
pub struct PathPatterns {
    patterns: Vec<PathPattern>,
}

impl PathPatterns {
    /// Compile `raw` patterns; blank entries are ignored.
    pub fn new<I, S>(raw: I) -> Result<Self, globset::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for pattern in raw {
            let normalized = normalize_filter_path(pattern.as_ref());
            if normalized.is_empty() {
                continue;
            }
            let matcher = GlobBuilder::new(&normalized)
                .case_insensitive(true)
                .literal_separator(true)
                .build()?
                .compile_matcher();
            patterns.push(PathPattern {
                segment_only: !normalized.contains('/'),
                raw: normalized,
                matcher,
            });
        }
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Normalized source patterns, in input order.
    pub fn raw(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.raw.as_str())
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.replace('\\', "/");
        self.patterns.iter().any(|p| p.matches(&rel_path))
    }

    /// How many distinct patterns match `rel_path`.
    pub fn match_count(&self, rel_path: &str) -> usize {
        let rel_path = rel_path.replace('\\', "/");
        self.patterns.iter().filter(|p| p.matches(&rel_path)).count()
    }
}

fn normalize_filter_path(raw: &str) -> String {
    let mut value = raw.trim().replace('\\', "/");
    while let Some(stripped) = value.strip_prefix("./") {
        value = stripped.to_string();
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_patterns_match_any_segment() {
        let patterns = PathPatterns::new(["*.log", "fixtures"]).unwrap();
        assert!(patterns.matches("app.log"));
        assert!(patterns.matches("logs/APP.LOG"));
        assert!(patterns.matches("tests/fixtures/data.json"));
        assert!(!patterns.matches("src/lib.rs"));
    }

    #[test]
    fn slash_patterns_match_full_path() {
        let patterns = PathPatterns::new(["src/*.ts"]).unwrap();
        assert!(patterns.matches("src/index.ts"));
        assert!(patterns.matches("SRC/Index.TS"));
        assert!(!patterns.matches("src/nested/index.ts"));

        let deep = PathPatterns::new(["src/**/*.ts"]).unwrap();
        assert!(deep.matches("src/nested/index.ts"));
        assert!(deep.matches("src/index.ts"));
    }

    #[test]
    fn question_mark_and_classes() {
        let patterns = PathPatterns::new(["v?.[jt]s"]).unwrap();
        assert!(patterns.matches("v1.ts"));
        assert!(patterns.matches("lib/v2.js"));
        assert!(!patterns.matches("v10.ts"));
    }

    #[test]
    fn blank_patterns_are_dropped() {
        let patterns = PathPatterns::new(["", ".", "./", "  "]).unwrap();
        assert!(patterns.is_empty());
        assert!(!patterns.matches("src/lib.rs"));
    }

    #[test]
    fn match_count_counts_each_pattern_once() {
        let patterns = PathPatterns::new(["*.ts", "auth*", "src/**"]).unwrap();
        assert_eq!(patterns.match_count("src/auth/login.ts"), 3);
        assert_eq!(patterns.match_count("docs/readme.md"), 0);
    }
}
