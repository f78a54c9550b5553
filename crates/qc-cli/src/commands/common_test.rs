use super::*;
use qc_core::test_utils::NORTHWIND_YAML;
use qc_core::TypeName;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn global(mapping: PathBuf, config: Option<PathBuf>) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        mapping,
        config,
    }
}

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_mapping_from_file() {
    let file = write_temp(NORTHWIND_YAML);
    let model = load_mapping(&global(file.path().to_path_buf(), None)).unwrap();
    assert!(model.types().any(|t| t.name == TypeName::new("Order")));
}

#[test]
fn test_missing_mapping_names_the_path() {
    let err = load_mapping(&global(PathBuf::from("/nonexistent/mapping.yml"), None)).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("/nonexistent/mapping.yml"), "{message}");
    assert!(message.contains("[E004]"), "{message}");
}

#[test]
fn test_config_defaults_without_a_file() {
    let config = load_config(&global(PathBuf::from("m.yml"), None)).unwrap();
    assert_eq!(config.provider, ProviderMode::Sql2008);
}

#[test]
fn test_config_from_file() {
    let file = write_temp("provider: sql_ce\nliterals: parameterize\n");
    let config = load_config(&global(PathBuf::from("m.yml"), Some(file.path().to_path_buf()))).unwrap();
    assert_eq!(config.provider, ProviderMode::SqlCe);
    assert!(!config.strategy().can_use_join_on);
}

#[test]
fn test_config_with_unknown_key_is_rejected() {
    let file = write_temp("provider: sql2008\nturbo: true\n");
    let err = load_config(&global(PathBuf::from("m.yml"), Some(file.path().to_path_buf()))).unwrap_err();
    assert!(format!("{err:#}").contains("[E002]"));
}

#[test]
fn test_load_query_from_file() {
    let file = write_temp(r#"{"kind": "table", "row_type": "Order"}"#);
    let query = load_query(file.path()).unwrap();
    assert!(matches!(query, QueryExpr::Table { .. }));
}

#[test]
fn test_malformed_query_json() {
    let err = parse_query(r#"{"kind": "tabel"}"#).unwrap_err();
    assert!(err.to_string().contains("Invalid query JSON"));
}

#[test]
fn test_provider_arg_conversion() {
    assert_eq!(ProviderMode::from(ProviderArg::Sql2000), ProviderMode::Sql2000);
    assert_eq!(ProviderMode::from(ProviderArg::SqlCe), ProviderMode::SqlCe);
}
