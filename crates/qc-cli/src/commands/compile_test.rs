use super::*;
use crate::cli::{CompileOutput, ProviderArg};
use qc_core::test_utils::northwind;
use qc_core::ProviderMode;
use std::path::PathBuf;

const EMPLOYEE_OVER_FIVE: &str = r#"{
    "kind": "call",
    "declaring": "queryable",
    "method": "Where",
    "args": [
        {"kind": "table", "row_type": "Order"},
        {"kind": "lambda",
         "params": [{"name": "o", "ty": {"type": "entity", "name": "Order"}}],
         "body": {"kind": "binary", "op": "greater_than",
                  "left": {"kind": "member",
                           "target": {"kind": "parameter", "name": "o",
                                      "ty": {"type": "entity", "name": "Order"}},
                           "member": "EmployeeID",
                           "ty": {"type": "scalar", "kind": "int32"}},
                  "right": {"kind": "constant", "value": {"kind": "int", "value": 5},
                            "ty": {"type": "scalar", "kind": "int32"}},
                  "ty": {"type": "scalar", "kind": "bool"}}}
    ],
    "ty": {"type": "sequence", "element": {"type": "entity", "name": "Order"}}
}"#;

fn args() -> CompileArgs {
    CompileArgs {
        query: PathBuf::from("q.json"),
        output: CompileOutput::Sql,
        provider: None,
        parameterize: false,
        validate: false,
        debug: false,
        passes: None,
        context: None,
    }
}

fn compile(config: &CompilerConfig) -> CompiledQuery {
    let query = super::super::common::parse_query(EMPLOYEE_OVER_FIVE).unwrap();
    compile_query(&northwind(), config, None, &query, None).unwrap()
}

#[test]
fn test_compile_json_query() {
    let compiled = compile(&CompilerConfig::default());
    let sql = format_output(&compiled, CompileOutput::Sql, false).unwrap();
    assert!(sql.starts_with("SELECT "), "{sql}");
    assert!(sql.contains("FROM [dbo].[Orders] AS [A0]"), "{sql}");
    assert!(sql.ends_with("WHERE [A0].[EmployeeID] > 5"), "{sql}");
}

#[test]
fn test_parameterized_output_lists_parameters() {
    let mut config = CompilerConfig::default();
    let mut a = args();
    a.parameterize = true;
    apply_overrides(&mut config, &a);
    let sql = format_output(&compile(&config), CompileOutput::Sql, false).unwrap();
    assert!(sql.contains("> @p0"), "{sql}");
    assert!(sql.contains("\n\n-- @p0"), "{sql}");
}

#[test]
fn test_json_output_is_the_compiled_query() {
    let compiled = compile(&CompilerConfig::default());
    let json = format_output(&compiled, CompileOutput::Json, false).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["statements"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["shape"]["kind"], "record");
    assert!(value["identity_statement"].is_null());
}

#[test]
fn test_overrides_layer_over_config() {
    let mut config = CompilerConfig::default();
    let mut a = args();
    a.provider = Some(ProviderArg::Sql2000);
    a.debug = true;
    a.context = Some("sales".to_string());
    apply_overrides(&mut config, &a);
    assert_eq!(config.provider, ProviderMode::Sql2000);
    assert!(config.debug_render);
    assert_eq!(config.context_id.as_deref(), Some("sales"));
}

#[test]
fn test_split_passes_ignores_blanks() {
    assert_eq!(split_passes("resolve, flatten,,"), vec!["resolve", "flatten"]);
}

#[test]
fn test_compile_error_keeps_its_code() {
    let query = super::super::common::parse_query(
        r#"{"kind": "table", "row_type": "Order", "context": "archive"}"#,
    )
    .unwrap();
    let err = compile_query(
        &northwind(),
        &CompilerConfig::default(),
        Some("sales"),
        &query,
        None,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("[QC014]"));
}
