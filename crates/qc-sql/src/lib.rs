//! qc-sql - Target dialect layer for the query compiler
//!
//! This crate provides provider storage types, SQL Server family dialect
//! descriptors (identifier quoting, literal formatting, LIKE escaping) and
//! re-parse validation of rendered text via sqlparser-rs.

pub mod dialect;
pub mod error;
pub mod types;
pub mod validator;

pub use dialect::{dialect_for, escape_like, SqlCeDialect, SqlDialect, SqlServerDialect};
pub use error::{SqlError, SqlResult};
pub use types::{
    ConversionMethod, ProviderType, SqlServerTypeProvider, SqlTypeKind, TypeProvider, TypeSize,
};
pub use validator::{expression_shape, validate_rendered};
