use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // short flag conflicts and duplicate args
    Cli::command().debug_assert();
}

#[test]
fn test_compile_defaults() {
    let cli = Cli::try_parse_from(["qc", "compile", "--query", "q.json"]).unwrap();
    assert_eq!(cli.global.mapping, PathBuf::from("mapping.yml"));
    assert!(cli.global.config.is_none());
    let Commands::Compile(args) = cli.command else {
        panic!("expected compile");
    };
    assert_eq!(args.output, CompileOutput::Sql);
    assert!(args.provider.is_none());
    assert!(!args.parameterize);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "qc",
        "compile",
        "-q",
        "q.json",
        "--provider",
        "sql-ce",
        "-m",
        "nw.yml",
        "-v",
    ])
    .unwrap();
    assert!(cli.global.verbose);
    assert_eq!(cli.global.mapping, PathBuf::from("nw.yml"));
    let Commands::Compile(args) = cli.command else {
        panic!("expected compile");
    };
    assert_eq!(args.provider, Some(ProviderArg::SqlCe));
}

#[test]
fn test_query_is_required() {
    assert!(Cli::try_parse_from(["qc", "compile"]).is_err());
}
