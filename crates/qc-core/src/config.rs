//! Compiler configuration
//!
//! The target provider determines a default capability record
//! ([`ConverterStrategy`]); individual capabilities can be overridden.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Target database provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderMode {
    Sql2000,
    Sql2005,
    #[default]
    Sql2008,
    SqlCe,
}

impl std::fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderMode::Sql2000 => write!(f, "sql2000"),
            ProviderMode::Sql2005 => write!(f, "sql2005"),
            ProviderMode::Sql2008 => write!(f, "sql2008"),
            ProviderMode::SqlCe => write!(f, "sql_ce"),
        }
    }
}

/// How Skip is implemented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStrategy {
    /// `ROW_NUMBER() OVER (...)` filter
    RowNumber,
    /// `NOT EXISTS` over the first `skip` rows
    NotExists,
}

/// How a generated identity is read back after an insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityRetrieval {
    /// `SCOPE_IDENTITY()`
    ScopeIdentity,
    /// `@@IDENTITY`
    GlobalIdentity,
}

/// Dialect capabilities that select between lowering strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterStrategy {
    /// Correlated element/scalar sub-selects may become OUTER APPLY joins
    pub can_use_outer_apply: bool,
    /// Joins may carry an ON clause (otherwise CROSS JOIN + WHERE)
    pub can_use_join_on: bool,
    pub skip_strategy: SkipStrategy,
    pub identity_retrieval: IdentityRetrieval,
    /// INSERT may use an OUTPUT clause to return generated keys
    pub can_output_from_insert: bool,
    /// `@@ROWCOUNT` is available after UPDATE/DELETE
    pub can_use_row_status: bool,
}

impl ConverterStrategy {
    /// Default capabilities of a provider
    pub fn for_provider(mode: ProviderMode) -> Self {
        match mode {
            ProviderMode::Sql2000 => ConverterStrategy {
                can_use_outer_apply: false,
                can_use_join_on: true,
                skip_strategy: SkipStrategy::NotExists,
                identity_retrieval: IdentityRetrieval::ScopeIdentity,
                can_output_from_insert: false,
                can_use_row_status: true,
            },
            ProviderMode::Sql2005 | ProviderMode::Sql2008 => ConverterStrategy {
                can_use_outer_apply: true,
                can_use_join_on: true,
                skip_strategy: SkipStrategy::RowNumber,
                identity_retrieval: IdentityRetrieval::ScopeIdentity,
                can_output_from_insert: true,
                can_use_row_status: true,
            },
            ProviderMode::SqlCe => ConverterStrategy {
                can_use_outer_apply: true,
                can_use_join_on: false,
                skip_strategy: SkipStrategy::NotExists,
                identity_retrieval: IdentityRetrieval::GlobalIdentity,
                can_output_from_insert: false,
                can_use_row_status: false,
            },
        }
    }
}

impl Default for ConverterStrategy {
    fn default() -> Self {
        Self::for_provider(ProviderMode::default())
    }
}

/// Per-field overrides of the provider's default strategy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyOverrides {
    #[serde(default)]
    pub can_use_outer_apply: Option<bool>,
    #[serde(default)]
    pub can_use_join_on: Option<bool>,
    #[serde(default)]
    pub skip_strategy: Option<SkipStrategy>,
    #[serde(default)]
    pub identity_retrieval: Option<IdentityRetrieval>,
    #[serde(default)]
    pub can_output_from_insert: Option<bool>,
    #[serde(default)]
    pub can_use_row_status: Option<bool>,
}

/// How client-supplied literals appear in the rendered text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LiteralMode {
    /// Rendered in place
    #[default]
    Inline,
    /// Collected into the parameter list as `@pN`
    Parameterize,
}

/// Compiler configuration, usually loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    /// Target provider
    #[serde(default)]
    pub provider: ProviderMode,

    /// Overrides of the provider's capabilities
    #[serde(default)]
    pub strategy: StrategyOverrides,

    /// Literal rendering
    #[serde(default)]
    pub literals: LiteralMode,

    /// Render otherwise-invalid nodes in a diagnostic form
    #[serde(default)]
    pub debug_render: bool,

    /// Identity of the data context being compiled for
    #[serde(default)]
    pub context_id: Option<String>,
}

impl CompilerConfig {
    /// Configuration for a provider with its default capabilities
    pub fn for_provider(provider: ProviderMode) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> CoreResult<Self> {
        let config: CompilerConfig =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CoreResult<()> {
        let strategy = self.strategy();
        if self.provider == ProviderMode::SqlCe && strategy.can_output_from_insert {
            return Err(CoreError::ConfigInvalid {
                message: "sql_ce does not support OUTPUT from INSERT".to_string(),
            });
        }
        if matches!(self.provider, ProviderMode::Sql2000 | ProviderMode::SqlCe)
            && strategy.skip_strategy == SkipStrategy::RowNumber
        {
            return Err(CoreError::ConfigInvalid {
                message: format!("{} has no ROW_NUMBER() support", self.provider),
            });
        }
        Ok(())
    }

    /// Effective capabilities: provider defaults with overrides applied
    pub fn strategy(&self) -> ConverterStrategy {
        let mut s = ConverterStrategy::for_provider(self.provider);
        let o = &self.strategy;
        if let Some(v) = o.can_use_outer_apply {
            s.can_use_outer_apply = v;
        }
        if let Some(v) = o.can_use_join_on {
            s.can_use_join_on = v;
        }
        if let Some(v) = o.skip_strategy {
            s.skip_strategy = v;
        }
        if let Some(v) = o.identity_retrieval {
            s.identity_retrieval = v;
        }
        if let Some(v) = o.can_output_from_insert {
            s.can_output_from_insert = v;
        }
        if let Some(v) = o.can_use_row_status {
            s.can_use_row_status = v;
        }
        s
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
