//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// qc - compile query trees into SQL Server text
#[derive(Parser, Debug)]
#[command(name = "qc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Mapping file (YAML)
    #[arg(short, long, global = true, default_value = "mapping.yml")]
    pub mapping: PathBuf,

    /// Compiler config file (YAML); provider defaults when absent
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a query tree (JSON) into SQL
    Compile(CompileArgs),

    /// Load mapping and config and report what they resolve to
    Check(CheckArgs),
}

/// Arguments for the compile command
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Query tree file (JSON); `-` reads standard input
    #[arg(short, long)]
    pub query: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "sql")]
    pub output: CompileOutput,

    /// Override the configured target provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,

    /// Render literals as @pN parameters
    #[arg(long)]
    pub parameterize: bool,

    /// Re-parse every rendered statement before printing
    #[arg(long)]
    pub validate: bool,

    /// Print the diagnostic rendering instead of the SQL text
    #[arg(long)]
    pub debug: bool,

    /// Only run the named reduction passes (comma-separated)
    #[arg(long)]
    pub passes: Option<String>,

    /// Session context identity checked against table handles
    #[arg(long)]
    pub context: Option<String>,
}

/// Compile output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileOutput {
    /// Statements separated by blank lines
    Sql,
    /// The full compiled query as JSON
    Json,
}

/// Target provider names accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderArg {
    Sql2000,
    Sql2005,
    Sql2008,
    SqlCe,
}

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Print the effective capability record
    #[arg(long)]
    pub strategy: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
