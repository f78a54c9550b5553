//! qc-core - Core library for the query compiler
//!
//! This crate provides the shared vocabulary of the compiler: strongly typed
//! names, the value-type system, literal values, the input operator-call
//! tree, the mapping metadata and session interfaces, and configuration.

pub mod config;
pub mod error;
pub mod mapping;
pub mod names;
pub mod query;
pub mod session;
pub mod types;
pub mod value;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use config::{
    CompilerConfig, ConverterStrategy, IdentityRetrieval, LiteralMode, ProviderMode,
    SkipStrategy, StrategyOverrides,
};
pub use error::{CoreError, CoreResult};
pub use mapping::{
    FunctionKind, MappingModel, MetaAssociation, MetaDataMember, MetaFunction, MetaModel,
    MetaParameter, MetaType,
};
pub use names::{MemberName, TypeName};
pub use query::{BinaryOperator, Declaring, LambdaParam, MemberInit, QueryExpr, UnaryOperator};
pub use session::{Session, StaticSession};
pub use types::{RecordField, ScalarKind, ValueType};
pub use value::{MidpointRounding, ObjectValue, Value};
