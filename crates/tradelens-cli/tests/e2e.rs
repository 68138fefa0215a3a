//! End-to-end tests for the TradeLens CLI.
//!
//! Tests invoke the `tradelens` binary as a subprocess and verify its output.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn tradelens_in(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tradelens"));
    cmd.current_dir(dir).env_remove("TRADELENS_CONFIG");
    cmd
}

fn run(dir: &Path, args: &[&str]) -> Output {
    let output = tradelens_in(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "{args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn run_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    serde_json::from_slice(&run(dir, args).stdout).unwrap()
}

fn init_graph(dir: &Path) -> PathBuf {
    let path = dir.join("graph.db");
    run(dir, &["graph", "init", path.to_str().unwrap()]);
    path
}

fn tables(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["table"].as_str().unwrap().to_string())
        .collect()
}

// === Relevance ===

#[test]
fn e2e_relevance_top_traders_by_pnl() {
    let dir = TempDir::new().unwrap();
    let result = run_json(dir.path(), &["relevance", "Show me top traders by PnL"]);

    let ranked = tables(&result);
    assert_eq!(ranked[0], "dim_trader");
    assert_eq!(ranked[1], "fact_trading_orders");
    for entry in result.as_array().unwrap() {
        let score = entry["relevanceScore"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
    assert!(result[0]["reasons"][0]
        .as_str()
        .unwrap()
        .starts_with("matched keyword 'traders'"));
}

#[test]
fn e2e_relevance_without_keywords_is_empty() {
    let dir = TempDir::new().unwrap();
    let result = run_json(dir.path(), &["relevance", "hello", "world"]);
    assert_eq!(result, serde_json::json!([]));
}

#[test]
fn e2e_relevance_table_format() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &["relevance", "securities trading today", "--format", "table"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("table"));
    assert!(stdout.contains("-+-"));
    assert!(stdout.contains("time context detected (current)"));
}

#[test]
fn e2e_relevance_markdown_format() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &["relevance", "trader desk", "--format", "markdown"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("| table | score | reasons |"));
}

// === Join path ===

#[test]
fn e2e_join_path_prepends_fact_table() {
    let dir = TempDir::new().unwrap();
    let result = run_json(dir.path(), &["join-path", "dim_security", "dim_trader"]);
    assert_eq!(
        result,
        serde_json::json!(["fact_trading_orders", "dim_security", "dim_trader"])
    );

    let result = run_json(dir.path(), &["join-path"]);
    assert_eq!(result, serde_json::json!([]));

    let result = run_json(
        dir.path(),
        &["join-path", "fact_trading_orders", "fact_trading_orders"],
    );
    assert_eq!(result, serde_json::json!(["fact_trading_orders"]));
}

// === Suggest ===

#[test]
fn e2e_suggest_completes_partial() {
    let dir = TempDir::new().unwrap();
    let result = run_json(dir.path(), &["suggest", "show", "traders"]);
    let suggestions = result.as_array().unwrap();
    assert_eq!(suggestions.len(), 5);
    assert!(suggestions
        .iter()
        .all(|s| s.as_str().unwrap().starts_with("show traders ")));

    let result = run_json(dir.path(), &["suggest"]);
    assert_eq!(result, serde_json::json!([]));
}

// === SQL ===

#[test]
fn e2e_sql_json_has_text_and_join_path() {
    let dir = TempDir::new().unwrap();
    let result = run_json(dir.path(), &["sql", "total pnl by security"]);
    assert_eq!(
        result["joinPath"],
        serde_json::json!(["fact_trading_orders", "dim_security"])
    );
    let sql = result["sql"].as_str().unwrap();
    assert!(sql.starts_with("SELECT ds.symbol, SUM(f.pnl) AS sum_pnl"));
    assert!(sql.contains("GROUP BY ds.symbol"));
}

#[test]
fn e2e_sql_table_format_prints_plain_sql() {
    let dir = TempDir::new().unwrap();
    let output = run(
        dir.path(),
        &["sql", "top 3 traders by pnl", "--format", "table"],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("SELECT "));
    assert!(stdout.trim_end().ends_with("LIMIT 3"));
}

// === Schema ===

#[test]
fn e2e_schema_diagrams() {
    let dir = TempDir::new().unwrap();

    let output = run(dir.path(), &["schema"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("erDiagram"));

    let output = run(dir.path(), &["schema", "--diagram", "dot"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("digraph tradelens {"));

    let result = run_json(dir.path(), &["schema", "--diagram", "json"]);
    assert_eq!(result["nodes"].as_array().unwrap().len(), 6);
}

// === Graph store ===

#[test]
fn e2e_graph_init_seeds_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.db");
    let result = run_json(dir.path(), &["graph", "init", path.to_str().unwrap()]);
    assert_eq!(result["tables"], 6);
    assert_eq!(result["relationships"], 5);
    assert!(result["keywords"].as_u64().unwrap() > 50);
    assert!(path.exists());
}

#[test]
fn e2e_graph_backend_matches_in_memory_ranking() {
    let dir = TempDir::new().unwrap();
    let db = init_graph(dir.path());

    let query = "average commission for limit orders yesterday";
    let graph = run_json(
        dir.path(),
        &["relevance", query, "--graph-db", db.to_str().unwrap()],
    );
    let memory = run_json(dir.path(), &["relevance", query]);
    assert_eq!(tables(&graph), tables(&memory));
}

#[test]
fn e2e_graph_stats_count_scored_tables() {
    let dir = TempDir::new().unwrap();
    let db = init_graph(dir.path());
    let db = db.to_str().unwrap();

    run(dir.path(), &["relevance", "desk", "--graph-db", db]);
    run(dir.path(), &["relevance", "desk", "--graph-db", db]);

    let stats = run_json(dir.path(), &["graph", "stats", "--graph-db", db]);
    let trader = stats
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "dim_trader")
        .unwrap();
    assert_eq!(trader["query_count"], 2);
    assert!(trader["last_queried"].as_str().is_some());

    let time = stats
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "dim_time")
        .unwrap();
    assert_eq!(time["query_count"], 0);
}

#[test]
fn e2e_missing_graph_store_falls_back() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.db");
    let output = run(
        dir.path(),
        &["relevance", "top traders by pnl", "--graph-db", missing.to_str().unwrap()],
    );
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tables(&result)[0], "dim_trader");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("graph store unavailable"));
}

#[test]
fn e2e_graph_stats_requires_store() {
    let dir = TempDir::new().unwrap();
    let output = tradelens_in(dir.path())
        .args(["graph", "stats"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// === Config ===

#[test]
fn e2e_config_file_sets_graph_path() {
    let dir = TempDir::new().unwrap();
    let db = init_graph(dir.path());
    std::fs::write(
        dir.path().join("tradelens.toml"),
        format!("[graph]\npath = {:?}\n", db.to_str().unwrap()),
    )
    .unwrap();

    run(dir.path(), &["relevance", "counterparty"]);
    let stats = run_json(dir.path(), &["graph", "stats"]);
    let counterparty = stats
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "dim_counterparty")
        .unwrap();
    assert_eq!(counterparty["query_count"], 1);
}

#[test]
fn e2e_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[scoring]\nrelationship_boost = 4.0\n").unwrap();
    let output = tradelens_in(dir.path())
        .args(["relevance", "trades", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

// === Completions ===

#[test]
fn e2e_completions_bash() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["completions", "bash"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("tradelens"));
}
