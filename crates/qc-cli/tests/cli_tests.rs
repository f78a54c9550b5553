//! End-to-end tests of the `qc` binary

use qc_core::test_utils::NORTHWIND_YAML;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled qc binary
fn qc_bin() -> String {
    env!("CARGO_BIN_EXE_qc").to_string()
}

/// Run a `qc` command and return (stdout, stderr, success)
fn run_qc(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(qc_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute qc with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

const TOP_THREE: &str = r#"{
    "kind": "call",
    "declaring": "queryable",
    "method": "Take",
    "args": [
        {"kind": "table", "row_type": "Customer"},
        {"kind": "constant", "value": {"kind": "int", "value": 3},
         "ty": {"type": "scalar", "kind": "int32"}}
    ],
    "ty": {"type": "sequence", "element": {"type": "entity", "name": "Customer"}}
}"#;

/// Temp project with the fixture mapping and one query file
struct Project {
    dir: TempDir,
}

impl Project {
    fn new(query: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mapping.yml"), NORTHWIND_YAML).unwrap();
        std::fs::write(dir.path().join("query.json"), query).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn arg(&self, name: &str) -> String {
        path_str(&self.path(name))
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

// ── compile ─────────────────────────────────────────────────────────────

#[test]
fn test_compile_prints_sql() {
    let project = Project::new(TOP_THREE);
    let (stdout, stderr, ok) = run_qc(&[
        "compile",
        "--mapping",
        &project.arg("mapping.yml"),
        "--query",
        &project.arg("query.json"),
        "--validate",
    ]);
    assert!(ok, "stderr: {stderr}");
    assert!(stdout.starts_with("SELECT TOP 3 "), "{stdout}");
    assert!(stdout.contains("FROM [dbo].[Customers] AS [A0]"), "{stdout}");
}

#[test]
fn test_compile_json_output() {
    let project = Project::new(TOP_THREE);
    let (stdout, stderr, ok) = run_qc(&[
        "compile",
        "-m",
        &project.arg("mapping.yml"),
        "-q",
        &project.arg("query.json"),
        "--output",
        "json",
    ]);
    assert!(ok, "stderr: {stderr}");
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["statements"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["parameters"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_compile_with_config_file() {
    let project = Project::new(TOP_THREE);
    std::fs::write(project.path("qc.yml"), "provider: sql_ce\n").unwrap();
    let (stdout, stderr, ok) = run_qc(&[
        "compile",
        "-m",
        &project.arg("mapping.yml"),
        "-c",
        &project.arg("qc.yml"),
        "-q",
        &project.arg("query.json"),
    ]);
    assert!(ok, "stderr: {stderr}");
    assert!(stdout.starts_with("SELECT TOP 3 "), "{stdout}");
}

#[test]
fn test_compile_error_exits_nonzero_with_code() {
    let project = Project::new(r#"{"kind": "table", "row_type": "Order", "context": "archive"}"#);
    let (_, stderr, ok) = run_qc(&[
        "compile",
        "-m",
        &project.arg("mapping.yml"),
        "-q",
        &project.arg("query.json"),
        "--context",
        "sales",
    ]);
    assert!(!ok);
    assert!(stderr.contains("[QC014]"), "{stderr}");
}

#[test]
fn test_missing_mapping_fails() {
    let project = Project::new(TOP_THREE);
    let (_, stderr, ok) = run_qc(&[
        "compile",
        "-m",
        &project.arg("nope.yml"),
        "-q",
        &project.arg("query.json"),
    ]);
    assert!(!ok);
    assert!(stderr.contains("Failed to load mapping"), "{stderr}");
}

// ── check ───────────────────────────────────────────────────────────────

#[test]
fn test_check_lists_types() {
    let project = Project::new(TOP_THREE);
    let (stdout, stderr, ok) = run_qc(&["check", "-m", &project.arg("mapping.yml"), "--strategy"]);
    assert!(ok, "stderr: {stderr}");
    assert!(stdout.contains("Customer  dbo.Customers"), "{stdout}");
    assert!(stdout.contains("provider: sql2008"), "{stdout}");
    assert!(stdout.contains("skip_strategy: row_number"), "{stdout}");
}
