use crate::common::{
    ensure_root, join_rel, list_sorted, Admission, BudgetedLoad, CandidateFilter, Exclusions,
};
use crate::error::Result;
use crate::strategy::LoadingStrategy;
use async_trait::async_trait;
use context_protocol::{FileSystem, LoadedContext, LoadingOptions};
use log::{debug, info};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub const BREADTH_FIRST: &str = "breadth-first";
pub const LEVEL_STATS_KEY: &str = "level_stats";
pub const DIRECTORY_STRUCTURE_KEY: &str = "directory_structure";

const DEFAULT_MAX_DEPTH: usize = 5;
const STRUCTURE_MAX_DEPTH: usize = 3;
const UNRANKED: u32 = 999;

/// Files and tokens admitted at one tree level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelStats {
    pub depth: usize,
    pub files: usize,
    pub tokens: usize,
}

/// Loads the shallowest files first, level by level.
pub struct BreadthFirstStrategy {
    fs: Arc<dyn FileSystem>,
}

/// Lower loads earlier within a directory.
pub fn entry_priority(name: &str) -> u32 {
    let stem = name.split('.').next().unwrap_or(name);
    match name {
        "README.md" => 1,
        "package.json" => 2,
        "tsconfig.json" => 3,
        _ if stem == "index" && name.contains('.') => 4,
        _ if stem == "main" && name.contains('.') => 5,
        _ if stem == "app" && name.contains('.') => 6,
        _ => UNRANKED,
    }
}

/// Order directory entries by [`entry_priority`], then by name.
pub fn sort_entries(names: &mut [String]) {
    names.sort_by(|a, b| {
        entry_priority(a)
            .cmp(&entry_priority(b))
            .then_with(|| a.cmp(b))
    });
}

impl BreadthFirstStrategy {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    async fn sorted_entries(&self, root: &Path, dir: &str) -> Vec<String> {
        let mut names = list_sorted(self.fs.as_ref(), root, dir).await;
        sort_entries(&mut names);
        names
    }

    /// Directory listings down to `max_depth`, keyed by root-relative dir.
    async fn collect_structure(
        &self,
        root: &Path,
        max_depth: usize,
        exclusions: &Exclusions,
    ) -> BTreeMap<String, Vec<(String, bool)>> {
        let mut listings = BTreeMap::new();
        let mut level = vec![String::new()];

        for depth in 0..max_depth {
            let mut next = Vec::new();
            for dir in level {
                let mut entries = Vec::new();
                for name in self.sorted_entries(root, &dir).await {
                    let rel = join_rel(&dir, &name);
                    if self.fs.is_directory(&root.join(&rel)).await {
                        if exclusions.skips_dir(&name, &rel) {
                            continue;
                        }
                        if depth + 1 < max_depth {
                            next.push(rel);
                        }
                        entries.push((name, true));
                    } else if !exclusions.skips_walked_file(&name, &rel) {
                        entries.push((name, false));
                    }
                }
                listings.insert(dir, entries);
            }
            level = next;
        }
        listings
    }
}

fn structure_node(
    name: &str,
    rel: &str,
    listings: &BTreeMap<String, Vec<(String, bool)>>,
) -> Value {
    let children: Vec<Value> = listings
        .get(rel)
        .map(|entries| {
            entries
                .iter()
                .map(|(child, is_dir)| {
                    let child_rel = join_rel(rel, child);
                    if *is_dir {
                        structure_node(child, &child_rel, listings)
                    } else {
                        json!({ "name": child, "path": child_rel, "type": "file" })
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    json!({ "name": name, "path": rel, "type": "directory", "children": children })
}

#[async_trait]
impl LoadingStrategy for BreadthFirstStrategy {
    fn name(&self) -> &str {
        BREADTH_FIRST
    }

    async fn load_context(&self, root: &Path, options: &LoadingOptions) -> Result<LoadedContext> {
        let exclusions = Exclusions::new(&options.exclude_patterns)?;
        let filter = CandidateFilter::new(exclusions.clone(), &options.file_types);
        ensure_root(self.fs.as_ref(), root).await?;
        let max_depth = options.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);

        let mut load = BudgetedLoad::new(
            self.fs.as_ref(),
            root,
            options.max_tokens,
            &exclusions,
            BREADTH_FIRST,
        );
        let mut stats = Vec::new();
        let mut level = vec![String::new()];

        for depth in 0..=max_depth {
            if level.is_empty() || load.exhausted() {
                break;
            }
            let mut current = LevelStats {
                depth,
                ..Default::default()
            };
            let mut next = Vec::new();

            'dirs: for dir in &level {
                for name in self.sorted_entries(root, dir).await {
                    let rel = join_rel(dir, &name);
                    let absolute = root.join(&rel);
                    if self.fs.is_directory(&absolute).await {
                        if depth < max_depth && !exclusions.skips_dir(&name, &rel) {
                            next.push(rel);
                        }
                        continue;
                    }
                    if !filter.accepts_walked(&name, &rel) {
                        continue;
                    }
                    if load.exhausted() {
                        break 'dirs;
                    }
                    if let Admission::Loaded(tokens) = load.admit(&rel).await {
                        current.files += 1;
                        current.tokens += tokens;
                    }
                }
            }

            debug!(
                "Level {depth}: {} files, {} tokens",
                current.files, current.tokens
            );
            stats.push(current);
            level = next;
        }

        let structure_depth = STRUCTURE_MAX_DEPTH.min(max_depth);
        let listings = self
            .collect_structure(root, structure_depth.max(1), &exclusions)
            .await;
        let root_name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        let metadata = &mut load.context_mut().metadata;
        metadata.insert(
            LEVEL_STATS_KEY.to_string(),
            serde_json::to_value(&stats).unwrap_or_default(),
        );
        metadata.insert(
            DIRECTORY_STRUCTURE_KEY.to_string(),
            structure_node(&root_name, "", &listings),
        );

        let context = load.into_context();
        info!(
            "Breadth-first load of {}: {} files over {} levels, {} tokens",
            root.display(),
            context.file_count(),
            stats.len(),
            context.total_tokens
        );
        Ok(context)
    }
}
