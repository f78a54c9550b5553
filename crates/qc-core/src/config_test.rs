use super::*;
use std::io::Write;

#[test]
fn test_parse_empty_config_uses_defaults() {
    let config: CompilerConfig = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.provider, ProviderMode::Sql2008);
    assert_eq!(config.literals, LiteralMode::Inline);
    assert!(!config.debug_render);
    let s = config.strategy();
    assert!(s.can_use_outer_apply);
    assert_eq!(s.skip_strategy, SkipStrategy::RowNumber);
}

#[test]
fn test_provider_defaults() {
    let s2000 = ConverterStrategy::for_provider(ProviderMode::Sql2000);
    assert!(!s2000.can_use_outer_apply);
    assert!(s2000.can_use_join_on);
    assert_eq!(s2000.skip_strategy, SkipStrategy::NotExists);

    let ce = ConverterStrategy::for_provider(ProviderMode::SqlCe);
    assert_eq!(ce.identity_retrieval, IdentityRetrieval::GlobalIdentity);
    assert!(!ce.can_use_join_on);
    assert!(!ce.can_use_row_status);
}

#[test]
fn test_overrides_apply() {
    let yaml = r#"
provider: sql2005
literals: parameterize
strategy:
  can_use_join_on: false
  skip_strategy: not_exists
"#;
    let config = CompilerConfig::from_yaml(yaml).unwrap();
    let s = config.strategy();
    assert!(!s.can_use_join_on);
    assert_eq!(s.skip_strategy, SkipStrategy::NotExists);
    assert!(s.can_use_outer_apply);
    assert_eq!(config.literals, LiteralMode::Parameterize);
}

#[test]
fn test_unknown_field_rejected() {
    let err = CompilerConfig::from_yaml("providr: sql2005").unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
}

#[test]
fn test_invalid_combination_rejected() {
    let yaml = "provider: sql2000\nstrategy:\n  skip_strategy: row_number\n";
    let err = CompilerConfig::from_yaml(yaml).unwrap_err();
    assert!(err.to_string().contains("ROW_NUMBER"));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "provider: sql_ce\ncontext_id: northwind").unwrap();
    let config = CompilerConfig::load(file.path()).unwrap();
    assert_eq!(config.provider, ProviderMode::SqlCe);
    assert_eq!(config.context_id.as_deref(), Some("northwind"));
}

#[test]
fn test_load_missing_file() {
    let err = CompilerConfig::load(Path::new("/nonexistent/qc.yml")).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}
