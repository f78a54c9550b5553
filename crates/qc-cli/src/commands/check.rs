//! Check command implementation

use anyhow::{Context, Result};
use qc_core::{CompilerConfig, MappingModel};

use super::common::{load_config, load_mapping};
use crate::cli::{CheckArgs, GlobalArgs};

/// Execute the check command
pub(crate) fn execute(args: &CheckArgs, global: &GlobalArgs) -> Result<()> {
    let model = load_mapping(global)?;
    let config = load_config(global)?;
    println!("{}", summarize(&model, &config, args.strategy)?);
    Ok(())
}

/// One line per mapped type, then the provider and optionally its capabilities
pub(crate) fn summarize(
    model: &MappingModel,
    config: &CompilerConfig,
    strategy: bool,
) -> Result<String> {
    let mut lines = Vec::new();
    for ty in model.types() {
        let keys: Vec<&str> = ty
            .identity_members()
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        let table = ty.table.as_deref().unwrap_or("-");
        let base = ty
            .base
            .as_ref()
            .map(|b| format!(" : {b}"))
            .unwrap_or_default();
        lines.push(format!(
            "{}{base}  {table}  {} member(s), key [{}]",
            ty.name,
            ty.members.len(),
            keys.join(", ")
        ));
    }
    lines.push(format!("provider: {}", config.provider));
    if strategy {
        let yaml = serde_yaml::to_string(&config.strategy())
            .context("Failed to serialize capabilities")?;
        lines.push(yaml.trim_end().to_string());
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
