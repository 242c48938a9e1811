use async_trait::async_trait;
use context_loader::{
    builtin_strategies, BreadthFirstStrategy, FocusedStrategy, LoaderError, LoadingStrategy,
    MarkerAnalyzer, ProgressiveStrategy, DIRECTORY_STRUCTURE_KEY, FOCUS_SUMMARY_KEY,
    LEVEL_STATS_KEY,
};
use context_protocol::{
    FileSystem, LoadedContext, LoadingOptions, LocalFileSystem, MemoryFileSystem,
    ProjectAnalyzer, ProjectInfo, ProjectStructure,
};
use context_relevance::{ScoringWeights, WeightOverrides};
use pretty_assertions::assert_eq;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Analyzer returning a fixed answer.
struct FixedAnalyzer(ProjectInfo);

#[async_trait]
impl ProjectAnalyzer for FixedAnalyzer {
    async fn analyze_project(&self, _root: &Path) -> io::Result<ProjectInfo> {
        Ok(self.0.clone())
    }
}

fn analyzer(entry_points: &[&str], config_files: &[&str], docs_dirs: &[&str]) -> Arc<FixedAnalyzer> {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    Arc::new(FixedAnalyzer(ProjectInfo {
        entry_points: owned(entry_points),
        structure: ProjectStructure {
            config_files: owned(config_files),
            docs_dirs: owned(docs_dirs),
            ..Default::default()
        },
        ..Default::default()
    }))
}

fn paths(context: &LoadedContext) -> Vec<&str> {
    context.paths().collect()
}

fn budget(max_tokens: usize) -> LoadingOptions {
    LoadingOptions::default().with_max_tokens(max_tokens)
}

#[tokio::test]
async fn progressive_must_have_stage_stops_at_first_miss() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/src/big.ts", "b".repeat(400))
        .add_file("/r/src/small.ts", "s".repeat(40))
        .add_file("/r/README.md", "r".repeat(40))
        .add_file("/r/docs/0-huge.md", "h".repeat(800))
        .add_file("/r/docs/a.md", "a".repeat(40))
        .add_file("/r/docs/b.md", "b".repeat(40));
    let strategy = ProgressiveStrategy::new(
        Arc::new(fs),
        analyzer(&["src/big.ts", "src/small.ts"], &[], &["docs"]),
    );

    let context = strategy.load_context(Path::new("/r"), &budget(60)).await.unwrap();

    // the oversized entry point blocks the smaller one behind it, while the
    // docs stage skips the oversized doc and keeps going
    assert_eq!(paths(&context), vec!["README.md", "docs/a.md", "docs/b.md"]);
    assert_eq!(context.total_tokens, 30);
    assert_eq!(context.strategy, "progressive");
    assert!(context.project_info().is_some());
}

#[tokio::test]
async fn progressive_config_stage_is_gated_by_used_budget() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/src/main.ts", "m".repeat(340))
        .add_file("/r/jest.config.js", "j".repeat(8));
    let fs: Arc<dyn FileSystem> = Arc::new(fs);
    let info = analyzer(&["src/main.ts"], &["jest.config.js"], &[]);

    let tight = ProgressiveStrategy::new(Arc::clone(&fs), info.clone())
        .load_context(Path::new("/r"), &budget(100))
        .await
        .unwrap();
    assert_eq!(paths(&tight), vec!["src/main.ts"]);

    let roomy = ProgressiveStrategy::new(fs, info)
        .load_context(Path::new("/r"), &budget(200))
        .await
        .unwrap();
    assert_eq!(paths(&roomy), vec!["src/main.ts", "jest.config.js"]);
    assert_eq!(roomy.total_tokens, 87);
}

#[tokio::test]
async fn progressive_oversized_entry_point_blocks_core_files() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/src/big.ts", "b".repeat(400))
        .add_file("/r/tsconfig.json", "t".repeat(40));
    let strategy = ProgressiveStrategy::new(Arc::new(fs), analyzer(&["src/big.ts"], &[], &[]));

    let context = strategy.load_context(Path::new("/r"), &budget(60)).await.unwrap();

    // entry points and core files form one priority list
    assert!(context.files.is_empty(), "{:?}", paths(&context));
    assert_eq!(context.total_tokens, 0);
}

#[tokio::test]
async fn progressive_config_stage_stops_at_first_miss() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/.env", "e".repeat(400))
        .add_file("/r/config.yaml", "c".repeat(40))
        .add_file("/r/docs/a.md", "a".repeat(400))
        .add_file("/r/docs/b.md", "b".repeat(40));
    let strategy = ProgressiveStrategy::new(
        Arc::new(fs),
        analyzer(&[], &["config.yaml", ".env"], &["docs"]),
    );

    let context = strategy.load_context(Path::new("/r"), &budget(60)).await.unwrap();

    // `.env` outranks `config.yaml` and does not fit, so the config stage
    // ends there; the docs stage skips `a.md` and still takes `b.md`
    assert_eq!(paths(&context), vec!["docs/b.md"]);
    assert_eq!(context.total_tokens, 10);
}

#[tokio::test]
async fn progressive_query_stage_ranks_by_relevance() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/README.md", "# Demo")
        .add_file("/r/src/other.ts", "export const x = 1;")
        .add_file("/r/src/auth/token.ts", "export const token = authToken();");
    let strategy = ProgressiveStrategy::new(Arc::new(fs), analyzer(&[], &[], &[]));

    let options = budget(1_000).with_query("auth token");
    let context = strategy.load_context(Path::new("/r"), &options).await.unwrap();
    assert_eq!(
        paths(&context),
        vec!["README.md", "src/auth/token.ts", "src/other.ts"]
    );
}

#[tokio::test]
async fn focused_loads_best_matches_first() {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/docs/readme.md", "Project docs")
        .add_file("/r/src/util.ts", "export const pad = 1;")
        .add_file("/r/src/auth/login.ts", "export function authLogin() {}")
        .add_file("/r/src/auth/token.ts", "export const authToken = 1");
    let strategy = FocusedStrategy::new(Arc::new(fs));

    let options = budget(1_000).with_query("auth");
    let context = strategy.load_context(Path::new("/r"), &options).await.unwrap();

    assert_eq!(
        paths(&context),
        vec!["src/auth/login.ts", "src/auth/token.ts", "src/util.ts"]
    );
    let summary = &context.metadata[FOCUS_SUMMARY_KEY];
    assert_eq!(summary["query"], "auth");
    assert_eq!(summary["candidates"], 4);
    assert_eq!(summary["loaded"], 3);
    assert!(summary["average_score"].as_f64().unwrap() >= 30.0);
}

fn name_versus_query_tree() -> Arc<dyn FileSystem> {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/src/main.ts", "x").add_file("/r/src/auth.ts", "auth");
    Arc::new(fs)
}

#[tokio::test]
async fn focused_weights_decide_between_name_and_query() {
    let fs = name_versus_query_tree();
    let options = budget(1_000).with_query("auth");

    // the entry-point name outweighs a weak query match under the profile
    let profile = FocusedStrategy::new(Arc::clone(&fs))
        .load_context(Path::new("/r"), &options)
        .await
        .unwrap();
    assert_eq!(paths(&profile), vec!["src/main.ts", "src/auth.ts"]);

    let query_heavy = ScoringWeights {
        query: 10.0,
        ..ScoringWeights::focused()
    };
    let reweighted = FocusedStrategy::new(fs)
        .with_weights(query_heavy)
        .load_context(Path::new("/r"), &options)
        .await
        .unwrap();
    assert_eq!(paths(&reweighted), vec!["src/auth.ts", "src/main.ts"]);
}

#[tokio::test]
async fn builtin_strategies_apply_weight_overrides() {
    let fs = name_versus_query_tree();
    let overrides = WeightOverrides {
        query: Some(10.0),
        ..Default::default()
    };
    let strategies = builtin_strategies(Arc::clone(&fs), analyzer(&[], &[], &[]), overrides);
    let focused = strategies
        .iter()
        .find(|strategy| strategy.name() == "focused")
        .unwrap();

    let context = focused
        .load_context(Path::new("/r"), &budget(1_000).with_query("auth"))
        .await
        .unwrap();
    assert_eq!(paths(&context), vec!["src/auth.ts", "src/main.ts"]);
}

#[tokio::test]
async fn focused_without_query_or_include_fails() {
    let strategy = FocusedStrategy::new(Arc::new(MemoryFileSystem::new()));
    let err = strategy
        .load_context(Path::new("/r"), &LoadingOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LoaderError::Configuration(_)));
}

fn bfs_tree() -> MemoryFileSystem {
    let mut fs = MemoryFileSystem::new();
    fs.add_file("/r/util.ts", "u".repeat(40))
        .add_file("/r/app.ts", "a".repeat(40))
        .add_file("/r/package.json", "p".repeat(40))
        .add_file("/r/README.md", "r".repeat(40))
        .add_file("/r/src/index.ts", "i".repeat(40))
        .add_file("/r/src/deep/x.ts", "x")
        .add_file("/r/node_modules/dep/index.js", "n");
    fs
}

#[tokio::test]
async fn breadth_first_loads_level_by_level() {
    let strategy = BreadthFirstStrategy::new(Arc::new(bfs_tree()));
    let context = strategy.load_context(Path::new("/r"), &budget(1_000)).await.unwrap();

    assert_eq!(
        paths(&context),
        vec![
            "README.md",
            "package.json",
            "app.ts",
            "util.ts",
            "src/index.ts",
            "src/deep/x.ts"
        ]
    );
    let levels = context.metadata[LEVEL_STATS_KEY].as_array().unwrap();
    assert_eq!(levels.len(), 3);
    assert_eq!(levels[0]["files"], 4);
    assert_eq!(levels[0]["tokens"], 40);
    assert_eq!(levels[2]["tokens"], 1);

    let tree = &context.metadata[DIRECTORY_STRUCTURE_KEY];
    let names: Vec<&str> = tree["children"]
        .as_array()
        .unwrap()
        .iter()
        .map(|child| child["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["README.md", "package.json", "app.ts", "src", "util.ts"]);
}

#[tokio::test]
async fn breadth_first_respects_depth_and_skips_oversized() {
    let mut fs = bfs_tree();
    fs.add_file("/r/package.json", "p".repeat(400));
    let strategy = BreadthFirstStrategy::new(Arc::new(fs));

    let mut options = budget(35);
    options.max_depth = Some(1);
    let context = strategy.load_context(Path::new("/r"), &options).await.unwrap();

    // package.json (100 tokens) is skipped, src/index.ts no longer fits
    assert_eq!(paths(&context), vec!["README.md", "app.ts", "util.ts"]);
    assert_eq!(context.total_tokens, 30);
}

#[tokio::test]
async fn every_strategy_stays_within_budget() {
    let fs: Arc<dyn FileSystem> = Arc::new(bfs_tree());
    let strategies = builtin_strategies(
        Arc::clone(&fs),
        analyzer(&["src/index.ts"], &[], &[]),
        WeightOverrides::default(),
    );

    for max_tokens in [0, 1, 9, 10, 25, 44, 1_000] {
        for strategy in &strategies {
            let options = budget(max_tokens).with_query("index");
            let context = strategy.load_context(Path::new("/r"), &options).await.unwrap();
            assert!(
                context.total_tokens <= max_tokens,
                "{} used {} of {max_tokens}",
                strategy.name(),
                context.total_tokens
            );
            let charged: usize = context.files.iter().map(|f| f.tokens).sum();
            assert_eq!(charged, context.total_tokens);
        }
    }
}

#[tokio::test]
async fn unreadable_root_is_fatal_for_every_strategy() {
    let fs: Arc<dyn FileSystem> = Arc::new(MemoryFileSystem::new());
    let strategies = builtin_strategies(
        Arc::clone(&fs),
        analyzer(&[], &[], &[]),
        WeightOverrides::default(),
    );

    for strategy in &strategies {
        let options = LoadingOptions::default().with_query("anything");
        let err = strategy
            .load_context(Path::new("/missing"), &options)
            .await
            .unwrap_err();
        assert!(
            matches!(err, LoaderError::RootUnreadable { .. }),
            "{}: {err}",
            strategy.name()
        );
    }
}

#[tokio::test]
async fn progressive_on_disk_with_marker_analyzer() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
    std::fs::write(
        root.join("package.json"),
        r#"{"name":"demo","main":"src/index.js","dependencies":{"express":"4"}}"#,
    )
    .unwrap();
    std::fs::write(root.join("src/index.js"), "const app = require('express')();").unwrap();
    std::fs::write(root.join("README.md"), "# Demo\n").unwrap();
    std::fs::write(root.join("node_modules/left-pad/index.js"), "module.exports = 1").unwrap();

    let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
    let strategy = ProgressiveStrategy::new(Arc::clone(&fs), Arc::new(MarkerAnalyzer::new(fs)));
    let context = strategy.load_context(root, &LoadingOptions::default()).await.unwrap();

    assert_eq!(paths(&context), vec!["src/index.js", "README.md", "package.json"]);
    let info = context.project_info().unwrap();
    assert_eq!(info.project_type, "node");
    assert_eq!(info.framework.as_deref(), Some("express"));
}
