use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

#[allow(deprecated)]
fn context_cmd(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("context").expect("binary");
    cmd.current_dir(workdir).env_remove("RUST_LOG");
    cmd
}

fn run_json(workdir: &Path, args: &[&str]) -> Value {
    let output = context_cmd(workdir)
        .args(args)
        .arg("--json")
        .output()
        .expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

fn setup_project() -> TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(
        root.join("Cargo.toml"),
        "[package]\nname = \"demo\"\nversion = \"0.1.0\"\n\n[dependencies]\nserde = \"1\"\n",
    )
    .unwrap();
    fs::write(root.join("README.md"), "# Demo\n\nA tiny demo project.\n").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {\n    println!(\"hi\");\n}\n").unwrap();
    fs::write(
        root.join("src/auth.rs"),
        "/// Auth token checks.\npub fn auth_token_valid(token: &str) -> bool {\n    // auth: reject an empty token\n    !token.is_empty()\n}\n",
    )
    .unwrap();
    fs::write(root.join("docs/notes.txt"), "meeting notes\n").unwrap();
    temp
}

fn paths(body: &Value) -> Vec<String> {
    body["files"]
        .as_array()
        .expect("files array")
        .iter()
        .map(|f| f["path"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn strategies_lists_builtins() {
    let temp = tempdir().unwrap();
    let body = run_json(temp.path(), &["strategies"]);
    assert_eq!(
        body,
        serde_json::json!(["breadth-first", "focused", "progressive"])
    );
}

#[test]
fn load_progressive_respects_budget() {
    let temp = setup_project();
    let body = run_json(temp.path(), &["load", ".", "--max-tokens", "4000"]);

    let loaded = paths(&body);
    assert!(loaded.contains(&"README.md".to_string()), "{loaded:?}");
    assert!(body["total_tokens"].as_u64().unwrap() <= 4000);
    assert_eq!(body["project_info"]["project_type"], "rust");
    assert!(body["summary"]
        .as_str()
        .unwrap()
        .contains("Strategy: progressive"));
}

#[test]
fn load_text_output_prints_summary() {
    let temp = setup_project();
    context_cmd(temp.path())
        .args(["load", "."])
        .assert()
        .success()
        .stdout(predicate::str::contains("Project: rust"))
        .stdout(predicate::str::contains("README.md"));
}

#[test]
fn load_focused_ranks_query_matches() {
    let temp = setup_project();
    let body = run_json(
        temp.path(),
        &["load", ".", "--strategy", "focused", "--query", "auth token"],
    );

    let loaded = paths(&body);
    assert_eq!(loaded.first().map(String::as_str), Some("src/auth.rs"));
    assert_eq!(body["metadata"]["focus_summary"]["query"], "auth token");
}

#[test]
fn load_focused_without_query_fails() {
    let temp = setup_project();
    context_cmd(temp.path())
        .args(["load", ".", "--strategy", "focused"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("focused loading requires"));
}

#[test]
fn load_unknown_strategy_fails() {
    let temp = setup_project();
    context_cmd(temp.path())
        .args(["load", ".", "--strategy", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown strategy: nope"));
}

#[test]
fn load_with_optimization_nests_optimized_context() {
    let temp = setup_project();
    let body = run_json(
        temp.path(),
        &["load", ".", "--optimization-strategy", "compress"],
    );

    let optimized = &body["optimized"];
    assert!(optimized.is_object(), "{body}");
    assert_eq!(optimized["metadata"]["optimization"]["strategy"], "compress");
    assert!(optimized["summary"]
        .as_str()
        .unwrap()
        .contains("Optimized (compress)"));
    assert!(body["metadata"].get("optimization").is_none());
}

#[test]
fn config_file_sets_default_strategy() {
    let temp = setup_project();
    let config = temp.path().join("context.toml");
    fs::write(&config, "[loading]\nstrategy = \"breadth-first\"\nmax_depth = 2\n").unwrap();

    let body = run_json(
        temp.path(),
        &["--config", config.to_str().unwrap(), "load", "."],
    );
    assert!(body["metadata"]["level_stats"].is_array(), "{body}");
    assert!(body["metadata"]["directory_structure"].is_object());
}

#[test]
fn config_file_with_unknown_key_is_rejected() {
    let temp = setup_project();
    let config = temp.path().join("context.toml");
    fs::write(&config, "[loadng]\nstrategy = \"focused\"\n").unwrap();

    context_cmd(temp.path())
        .args(["--config", config.to_str().unwrap(), "strategies"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("context.toml"));
}

#[test]
fn score_ranks_explicit_paths() {
    let temp = setup_project();
    let body = run_json(
        temp.path(),
        &["score", ".", "src/auth.rs", "docs/notes.txt", "--query", "auth token"],
    );

    let ranked = body.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["path"], "src/auth.rs");
    assert!(ranked[0]["score"].as_f64().unwrap() >= ranked[1]["score"].as_f64().unwrap());
    assert!(ranked[0]["factors"]["query"].as_f64().unwrap() > 0.0);
    assert_eq!(ranked[1]["factors"]["query"], 0.0);
}

#[test]
fn score_walks_project_when_no_paths_given() {
    let temp = setup_project();
    let body = run_json(temp.path(), &["score", ".", "--limit", "3"]);

    let ranked = body.as_array().unwrap();
    assert_eq!(ranked.len(), 3);
    for pair in ranked.windows(2) {
        assert!(pair[0]["score"].as_f64().unwrap() >= pair[1]["score"].as_f64().unwrap());
    }
}

#[test]
fn tokens_reports_breakdown() {
    let temp = setup_project();
    fs::write(
        temp.path().join("docs/snippet.md"),
        "```rust\nfn main() {}\n```\n",
    )
    .unwrap();

    // bare source text has no fence or indentation to mark it as code
    let plain = run_json(temp.path(), &["tokens", "src/main.rs"]);
    assert!(plain["total_tokens"].as_u64().unwrap() > 0);
    assert!(plain["breakdown"]["other"]["tokens"].as_u64().unwrap() > 0);
    assert_eq!(plain["breakdown"]["code"]["tokens"], 0);
    assert_eq!(plain["within_limit"], true);

    let fenced = run_json(temp.path(), &["tokens", "docs/snippet.md"]);
    assert!(fenced["breakdown"]["code"]["tokens"].as_u64().unwrap() > 0);
    assert_eq!(fenced["breakdown"]["other"]["tokens"], 0);
}

#[test]
fn config_weights_reorder_focused_load() {
    let project = tempdir().unwrap();
    fs::create_dir_all(project.path().join("src")).unwrap();
    fs::write(project.path().join("src/main.ts"), "x").unwrap();
    fs::write(project.path().join("src/auth.ts"), "auth").unwrap();
    let args = ["load", ".", "--strategy", "focused", "--query", "auth"];

    let default = run_json(project.path(), &args);
    assert_eq!(paths(&default), vec!["src/main.ts", "src/auth.ts"]);

    let settings = tempdir().unwrap();
    let config = settings.path().join("context.toml");
    fs::write(&config, "[weights]\nquery = 10.0\n").unwrap();
    let mut with_config = vec!["--config", config.to_str().unwrap()];
    with_config.extend(args);

    let reweighted = run_json(project.path(), &with_config);
    assert_eq!(paths(&reweighted), vec!["src/auth.ts", "src/main.ts"]);
}

#[test]
fn chunk_splits_into_bounded_pieces() {
    let temp = tempdir().unwrap();
    let doc = (0..12)
        .map(|i| format!("Paragraph {i} talks about something worth reading twice."))
        .collect::<Vec<_>>()
        .join("\n\n");
    fs::write(temp.path().join("doc.md"), doc).unwrap();

    let body = run_json(temp.path(), &["chunk", "doc.md", "--max-chunk-size", "40"]);
    let chunks = body.as_array().unwrap();
    assert!(chunks.len() > 1, "{body}");
    assert_eq!(chunks[0]["index"], 0);
}

#[test]
fn optimize_compress_shrinks_long_comments() {
    let temp = tempdir().unwrap();
    let source = format!(
        "/* {} */\nfn main() {{\n    let x = 1;\n}}\n",
        "explains the algorithm in detail ".repeat(10)
    );
    fs::write(temp.path().join("main.rs"), source).unwrap();

    let body = run_json(temp.path(), &["optimize", "main.rs", "--strategy", "compress"]);
    assert_eq!(body["strategy"], "compress");
    assert!(body["optimized_tokens"].as_u64().unwrap() < body["original_tokens"].as_u64().unwrap());
}

#[test]
fn missing_file_reports_path() {
    let temp = tempdir().unwrap();
    context_cmd(temp.path())
        .args(["tokens", "absent.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.txt"));
}
