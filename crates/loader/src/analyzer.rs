//! Marker-file project analysis.
//!
//! Reads manifests and well-known names at the root; nothing is executed and
//! nothing below the second directory level is visited. The independent checks
//! run concurrently.

use crate::common::{is_ignored_dir, list_sorted};
use async_trait::async_trait;
use context_optimizer::Language;
use context_protocol::{FileSystem, ProjectAnalyzer, ProjectInfo, ProjectStructure};
use log::debug;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::Path;
use std::sync::Arc;

const MAX_LANGUAGES: usize = 8;
const MAX_ENTRY_POINTS: usize = 10;
const MAX_CONFIG_FILES: usize = 20;

const SRC_DIRS: &[&str] = &["src", "lib", "app", "source", "pkg", "cmd", "internal"];
const TEST_DIRS: &[&str] = &["test", "tests", "__tests__", "spec", "e2e"];
const DOCS_DIRS: &[&str] = &["docs", "doc", "documentation"];
const STATIC_DIRS: &[&str] = &["public", "static", "assets"];

const CONFIG_NAMES: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "Cargo.toml",
    "pyproject.toml",
    "setup.cfg",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "docker-compose.yml",
    "docker-compose.yaml",
    "Dockerfile",
    "Makefile",
];

const ENTRY_CANDIDATES: &[&str] = &[
    "src/index.ts",
    "src/index.tsx",
    "src/index.js",
    "src/main.ts",
    "src/main.js",
    "src/app.ts",
    "src/server.ts",
    "index.ts",
    "index.js",
    "server.js",
    "app.js",
    "src/main.rs",
    "src/lib.rs",
    "main.go",
    "cmd/main.go",
    "main.py",
    "app.py",
    "src/main.py",
    "manage.py",
];

/// Manifest dependency name to framework label, first match wins.
const FRAMEWORKS: &[(&str, &str)] = &[
    ("next", "next"),
    ("nuxt", "nuxt"),
    ("@angular/core", "angular"),
    ("svelte", "svelte"),
    ("vue", "vue"),
    ("react", "react"),
    ("@nestjs/core", "nestjs"),
    ("express", "express"),
    ("axum", "axum"),
    ("actix-web", "actix-web"),
    ("rocket", "rocket"),
    ("django", "django"),
    ("flask", "flask"),
    ("fastapi", "fastapi"),
    ("github.com/gin-gonic/gin", "gin"),
    ("spring-boot", "spring"),
];

const TEST_FRAMEWORKS: &[(&str, &str)] = &[
    ("vitest", "vitest"),
    ("jest", "jest"),
    ("mocha", "mocha"),
    ("@playwright/test", "playwright"),
    ("pytest", "pytest"),
];

fn push_fact(out: &mut Vec<String>, value: &str, max: usize) {
    if out.len() >= max || out.iter().any(|existing| existing == value) {
        return;
    }
    out.push(value.to_string());
}

/// Default [`ProjectAnalyzer`] driven by marker files.
pub struct MarkerAnalyzer {
    fs: Arc<dyn FileSystem>,
}

impl MarkerAnalyzer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    async fn read(&self, root: &Path, rel: &str) -> Option<String> {
        match self.fs.read_file(&root.join(rel)).await {
            Ok(content) => Some(content),
            Err(err) => {
                debug!("Cannot read {rel}: {err}");
                None
            }
        }
    }

    async fn dependencies(&self, root: &Path, names: &BTreeSet<String>) -> BTreeMap<String, String> {
        let mut deps = BTreeMap::new();

        if names.contains("package.json") {
            if let Some(raw) = self.read(root, "package.json").await {
                deps.extend(package_json_dependencies(&raw));
            }
        }
        if names.contains("Cargo.toml") {
            if let Some(raw) = self.read(root, "Cargo.toml").await {
                deps.extend(cargo_dependencies(&raw));
            }
        }
        if names.contains("requirements.txt") {
            if let Some(raw) = self.read(root, "requirements.txt").await {
                deps.extend(requirements_dependencies(&raw));
            }
        }
        if names.contains("go.mod") {
            if let Some(raw) = self.read(root, "go.mod").await {
                deps.extend(go_mod_dependencies(&raw));
            }
        }
        for manifest in ["pom.xml", "build.gradle", "build.gradle.kts"] {
            if !names.contains(manifest) {
                continue;
            }
            if let Some(raw) = self.read(root, manifest).await {
                if raw.contains("spring-boot") {
                    deps.entry("spring-boot".to_string()).or_default();
                }
            }
        }

        deps
    }

    /// Extension histogram over the root and its immediate subdirectories.
    async fn languages(&self, root: &Path, names: &BTreeSet<String>) -> Vec<String> {
        let mut counts: HashMap<Language, usize> = HashMap::new();
        let mut record = |name: &str| {
            let language = Language::from_path(name);
            if language.is_programming() {
                *counts.entry(language).or_default() += 1;
            }
        };

        for name in names {
            let absolute = root.join(name);
            if self.fs.is_directory(&absolute).await {
                if is_ignored_dir(name) {
                    continue;
                }
                for child in list_sorted(self.fs.as_ref(), root, name).await {
                    record(&child);
                }
            } else {
                record(name);
            }
        }

        let mut ranked: Vec<(Language, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        ranked
            .into_iter()
            .take(MAX_LANGUAGES)
            .map(|(language, _)| language.as_str().to_string())
            .collect()
    }

    async fn structure(&self, root: &Path, names: &BTreeSet<String>) -> ProjectStructure {
        let mut structure = ProjectStructure::default();
        for name in names {
            if self.fs.is_directory(&root.join(name)).await {
                let lowered = name.to_lowercase();
                let lowered = lowered.as_str();
                if SRC_DIRS.contains(&lowered) {
                    structure.src_dirs.push(name.clone());
                } else if TEST_DIRS.contains(&lowered) {
                    structure.test_dirs.push(name.clone());
                } else if DOCS_DIRS.contains(&lowered) {
                    structure.docs_dirs.push(name.clone());
                } else if STATIC_DIRS.contains(&lowered) {
                    structure.static_dirs.push(name.clone());
                }
            } else if is_config_file(name) {
                push_fact(&mut structure.config_files, name, MAX_CONFIG_FILES);
            }
        }
        structure
    }

    async fn entry_points(&self, root: &Path, names: &BTreeSet<String>) -> Vec<String> {
        let mut entries = Vec::new();

        if names.contains("package.json") {
            if let Some(main) = self
                .read(root, "package.json")
                .await
                .and_then(|raw| package_json_main(&raw))
            {
                if self.fs.is_file(&root.join(&main)).await {
                    push_fact(&mut entries, &main, MAX_ENTRY_POINTS);
                }
            }
        }
        for candidate in ENTRY_CANDIDATES {
            if self.fs.is_file(&root.join(candidate)).await {
                push_fact(&mut entries, candidate, MAX_ENTRY_POINTS);
            }
        }
        entries
    }
}

#[async_trait]
impl ProjectAnalyzer for MarkerAnalyzer {
    async fn analyze_project(&self, root: &Path) -> io::Result<ProjectInfo> {
        let names: BTreeSet<String> = self.fs.list_directory(root).await?.into_iter().collect();

        let (dependencies, languages, structure, entry_points) = tokio::join!(
            self.dependencies(root, &names),
            self.languages(root, &names),
            self.structure(root, &names),
            self.entry_points(root, &names),
        );

        let project_type = detect_project_type(&names);
        let info = ProjectInfo {
            framework: detect_framework(&dependencies),
            test_framework: detect_test_framework(&project_type, &dependencies),
            build_tool: detect_build_tool(&names),
            project_type,
            languages,
            structure,
            dependencies,
            entry_points,
        };
        debug!(
            "Analyzed {}: type={} framework={:?} entry_points={}",
            root.display(),
            info.project_type,
            info.framework,
            info.entry_points.len()
        );
        Ok(info)
    }
}

fn is_config_file(name: &str) -> bool {
    CONFIG_NAMES.contains(&name)
        || name.starts_with(".env")
        || name.starts_with("tsconfig")
        || name.contains(".config.")
        || name.starts_with(".eslintrc")
        || name.starts_with(".prettierrc")
}

fn detect_project_type(names: &BTreeSet<String>) -> String {
    let has = |name: &str| names.contains(name);
    let kind = if has("package.json") {
        "node"
    } else if has("Cargo.toml") {
        "rust"
    } else if has("pyproject.toml") || has("requirements.txt") || has("setup.py") {
        "python"
    } else if has("go.mod") {
        "go"
    } else if has("pom.xml") || has("build.gradle") || has("build.gradle.kts") {
        "java"
    } else {
        "unknown"
    };
    kind.to_string()
}

fn detect_framework(deps: &BTreeMap<String, String>) -> Option<String> {
    FRAMEWORKS
        .iter()
        .find(|(dep, _)| deps.contains_key(*dep))
        .map(|(_, name)| name.to_string())
}

fn detect_test_framework(project_type: &str, deps: &BTreeMap<String, String>) -> Option<String> {
    if let Some((_, name)) = TEST_FRAMEWORKS.iter().find(|(dep, _)| deps.contains_key(*dep)) {
        return Some(name.to_string());
    }
    match project_type {
        "rust" => Some("cargo test".to_string()),
        "go" => Some("go test".to_string()),
        _ => None,
    }
}

fn detect_build_tool(names: &BTreeSet<String>) -> Option<String> {
    let has = |name: &str| names.contains(name);
    let tool = if has("pnpm-lock.yaml") {
        "pnpm"
    } else if has("yarn.lock") {
        "yarn"
    } else if has("bun.lockb") {
        "bun"
    } else if has("package.json") {
        "npm"
    } else if has("Cargo.toml") {
        "cargo"
    } else if has("go.mod") {
        "go"
    } else if has("pom.xml") {
        "maven"
    } else if has("build.gradle") || has("build.gradle.kts") {
        "gradle"
    } else if has("poetry.lock") {
        "poetry"
    } else if has("pyproject.toml") || has("requirements.txt") || has("setup.py") {
        "pip"
    } else {
        return None;
    };
    Some(tool.to_string())
}

fn package_json_dependencies(raw: &str) -> BTreeMap<String, String> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return BTreeMap::new();
    };
    ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|section| value.get(*section)?.as_object())
        .flat_map(|deps| deps.iter())
        .map(|(name, version)| (name.clone(), version.as_str().unwrap_or_default().to_string()))
        .collect()
}

fn package_json_main(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    let main = value.get("main")?.as_str()?;
    let main = main.trim().trim_start_matches("./");
    (!main.is_empty()).then(|| main.to_string())
}

fn cargo_dependencies(raw: &str) -> BTreeMap<String, String> {
    let Ok(value) = raw.parse::<toml::Table>() else {
        return BTreeMap::new();
    };
    let Some(deps) = value.get("dependencies").and_then(|d| d.as_table()) else {
        return BTreeMap::new();
    };
    deps.iter()
        .map(|(name, spec)| {
            let version = match spec {
                toml::Value::String(version) => version.clone(),
                toml::Value::Table(table) => table
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                _ => String::new(),
            };
            (name.clone(), version)
        })
        .collect()
}

fn requirements_dependencies(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(|line| {
            let split = line
                .find(|c: char| matches!(c, '=' | '<' | '>' | '~' | '!' | '[' | ';' | ' '))
                .unwrap_or(line.len());
            let (name, rest) = line.split_at(split);
            let version = rest.trim_start_matches(|c: char| matches!(c, '=' | '<' | '>' | '~' | '!'));
            (!name.is_empty()).then(|| (name.to_lowercase(), version.trim().to_string()))
        })
        .collect()
}

fn go_mod_dependencies(raw: &str) -> BTreeMap<String, String> {
    let mut deps = BTreeMap::new();
    let mut in_block = false;
    for line in raw.lines().map(str::trim) {
        let spec = if in_block {
            if line == ")" {
                in_block = false;
                continue;
            }
            line
        } else if line == "require (" {
            in_block = true;
            continue;
        } else if let Some(rest) = line.strip_prefix("require ") {
            rest
        } else {
            continue;
        };
        let mut parts = spec.split_whitespace();
        if let (Some(module), Some(version)) = (parts.next(), parts.next()) {
            deps.insert(module.to_string(), version.to_string());
        }
    }
    deps
}
