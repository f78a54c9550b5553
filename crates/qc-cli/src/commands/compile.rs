//! Compile command implementation

use anyhow::{Context, Result};
use qc_compiler::{CompiledQuery, QueryCompiler};
use qc_core::{CompilerConfig, LiteralMode, MappingModel, QueryExpr, StaticSession};
use qc_sql::{dialect_for, validate_rendered, SqlServerTypeProvider};

use super::common::{load_config, load_mapping, load_query};
use crate::cli::{CompileArgs, CompileOutput, GlobalArgs};

/// Execute the compile command
pub(crate) fn execute(args: &CompileArgs, global: &GlobalArgs) -> Result<()> {
    let model = load_mapping(global)?;
    let mut config = load_config(global)?;
    apply_overrides(&mut config, args);
    let query = load_query(&args.query)?;

    let passes = args.passes.as_deref().map(split_passes);
    let compiled = compile_query(
        &model,
        &config,
        args.context.as_deref(),
        &query,
        passes.as_deref(),
    )?;

    if args.validate {
        let dialect = dialect_for(config.provider);
        let count = validate_rendered(dialect.as_ref(), &compiled.statements)
            .context("Rendered SQL failed to re-parse")?;
        log::info!("Validated {} statement(s) for {}", count, config.provider);
    }

    println!("{}", format_output(&compiled, args.output, args.debug)?);
    Ok(())
}

/// Command-line flags layered over the loaded config
pub(crate) fn apply_overrides(config: &mut CompilerConfig, args: &CompileArgs) {
    if let Some(provider) = args.provider {
        config.provider = provider.into();
    }
    if args.parameterize {
        config.literals = LiteralMode::Parameterize;
    }
    if args.debug {
        config.debug_render = true;
    }
    if let Some(context) = &args.context {
        config.context_id = Some(context.clone());
    }
}

fn split_passes(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Compile one query tree against a loaded mapping
pub(crate) fn compile_query(
    model: &MappingModel,
    config: &CompilerConfig,
    context: Option<&str>,
    query: &QueryExpr,
    passes: Option<&[String]>,
) -> Result<CompiledQuery> {
    let session = match context {
        Some(id) => StaticSession::new().with_context(id),
        None => StaticSession::new(),
    };
    let types = SqlServerTypeProvider::new();
    let compiler = QueryCompiler::new(model, &session, &types, config);
    let compiled = compiler
        .compile_with_passes(query, passes)
        .with_context(|| format!("Failed to compile {}", query.describe()))?;
    log::debug!(
        "{} statement(s), {} parameter(s)",
        compiled.statements.len(),
        compiled.parameters.len()
    );
    Ok(compiled)
}

/// Text printed for a compiled query
pub(crate) fn format_output(
    compiled: &CompiledQuery,
    output: CompileOutput,
    debug: bool,
) -> Result<String> {
    match output {
        CompileOutput::Json => {
            serde_json::to_string_pretty(compiled).context("Failed to serialize compiled query")
        }
        CompileOutput::Sql if debug => Ok(compiled.debug_text.clone()),
        CompileOutput::Sql => {
            let mut out = compiled.text();
            for (i, child) in compiled.children.iter().enumerate() {
                out.push_str(&format!("\n\n-- child query {i}\n{}", child.text));
            }
            if !compiled.parameters.is_empty() {
                out.push_str("\n\n");
                let lines: Vec<String> = compiled
                    .parameters
                    .iter()
                    .map(|p| match &p.value {
                        Some(value) => format!("-- {} = {}", p.name, value),
                        None => format!("-- {}", p.name),
                    })
                    .collect();
                out.push_str(&lines.join("\n"));
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
#[path = "compile_test.rs"]
mod tests;
