use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

/// Well-known directories and root config files of a project, root-relative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectStructure {
    pub src_dirs: Vec<String>,
    pub test_dirs: Vec<String>,
    pub config_files: Vec<String>,
    pub docs_dirs: Vec<String>,
    pub static_dirs: Vec<String>,
}

/// Result of a lightweight project scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectInfo {
    pub project_type: String,
    pub framework: Option<String>,
    pub languages: Vec<String>,
    pub structure: ProjectStructure,
    /// Dependency name to declared version (empty when unpinned).
    pub dependencies: BTreeMap<String, String>,
    pub test_framework: Option<String>,
    pub build_tool: Option<String>,
    /// Root-relative entry files, highest priority first.
    pub entry_points: Vec<String>,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            project_type: "unknown".to_string(),
            framework: None,
            languages: Vec::new(),
            structure: ProjectStructure::default(),
            dependencies: BTreeMap::new(),
            test_framework: None,
            build_tool: None,
            entry_points: Vec::new(),
        }
    }
}

/// Black-box project detector. Failing to read the root itself is the only
/// error an implementation should surface; anything below the root degrades to
/// missing facts.
#[async_trait]
pub trait ProjectAnalyzer: Send + Sync {
    async fn analyze_project(&self, root: &Path) -> io::Result<ProjectInfo>;
}
