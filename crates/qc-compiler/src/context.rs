//! Compile context - collaborators available to every stage

use crate::error::CompileResult;
use qc_core::{
    CompilerConfig, ConverterStrategy, MetaDataMember, MetaModel, ProviderMode, Session, ValueType,
};
use qc_sql::{ProviderType, TypeProvider};

/// Read-only services threaded through lowering, binding and rendering
pub struct CompileContext<'a> {
    /// Mapping metadata
    pub(crate) model: &'a dyn MetaModel,
    /// Session supplying queryables, update diffs and association filters
    pub(crate) session: &'a dyn Session,
    /// Provider type system
    pub(crate) types: &'a dyn TypeProvider,
    /// Effective dialect capabilities
    pub(crate) strategy: ConverterStrategy,
    pub(crate) config: &'a CompilerConfig,
}

impl<'a> CompileContext<'a> {
    /// Create a context; the strategy is derived from the config
    pub fn new(
        model: &'a dyn MetaModel,
        session: &'a dyn Session,
        types: &'a dyn TypeProvider,
        config: &'a CompilerConfig,
    ) -> Self {
        Self {
            model,
            session,
            types,
            strategy: config.strategy(),
            config,
        }
    }

    /// Target provider
    pub fn provider(&self) -> ProviderMode {
        self.config.provider
    }

    /// Context identity compared against table handles; the session wins
    /// over the config
    pub fn context_id(&self) -> Option<&str> {
        self.session
            .context_id()
            .or(self.config.context_id.as_deref())
    }

    /// Default provider type of a host type
    pub fn provider_type(&self, ty: &ValueType) -> Option<ProviderType> {
        self.types.from_value_type(ty)
    }

    /// Storage type of a mapped member: its declared db type, else the default
    pub fn member_provider(&self, member: &MetaDataMember) -> CompileResult<Option<ProviderType>> {
        match &member.db_type {
            Some(db_type) => Ok(Some(self.types.parse_db_type(db_type)?)),
            None => Ok(self.provider_type(&member.ty)),
        }
    }
}
