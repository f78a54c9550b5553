//! Loading shared by the commands

use anyhow::{Context, Result};
use qc_core::{CompilerConfig, MappingModel, ProviderMode, QueryExpr};
use std::io::Read;
use std::path::Path;

use crate::cli::{GlobalArgs, ProviderArg};

impl From<ProviderArg> for ProviderMode {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Sql2000 => ProviderMode::Sql2000,
            ProviderArg::Sql2005 => ProviderMode::Sql2005,
            ProviderArg::Sql2008 => ProviderMode::Sql2008,
            ProviderArg::SqlCe => ProviderMode::SqlCe,
        }
    }
}

/// Mapping named by `--mapping`
pub(crate) fn load_mapping(global: &GlobalArgs) -> Result<MappingModel> {
    let mapping = MappingModel::load(&global.mapping)
        .with_context(|| format!("Failed to load mapping {}", global.mapping.display()))?;
    log::debug!("Loaded mapping from {}", global.mapping.display());
    Ok(mapping)
}

/// Config named by `--config`, or the provider defaults
pub(crate) fn load_config(global: &GlobalArgs) -> Result<CompilerConfig> {
    match &global.config {
        Some(path) => CompilerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(CompilerConfig::default()),
    }
}

/// Query tree from a JSON file, `-` meaning standard input
pub(crate) fn load_query(path: &Path) -> Result<QueryExpr> {
    let text = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read query from stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read query {}", path.display()))?
    };
    parse_query(&text)
}

/// Query tree from JSON text
pub(crate) fn parse_query(json: &str) -> Result<QueryExpr> {
    serde_json::from_str(json).context("Invalid query JSON")
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
