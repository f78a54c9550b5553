//! qc - compile query trees against a mapping into SQL Server text

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::{check, compile};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match &cli.command {
        cli::Commands::Compile(args) => compile::execute(args, &cli.global),
        cli::Commands::Check(args) => check::execute(args, &cli.global),
    }
}
