//! Error types for qc-sql

use thiserror::Error;

/// Dialect and provider-type errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// SQL parse error (S001)
    #[error("[S001] SQL parse error at line {line}, column {column}: {message}")]
    ParseError {
        message: String,
        line: usize,
        column: usize,
    },

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,

    /// Database type string could not be parsed (S003)
    #[error("[S003] Unknown database type '{0}'")]
    UnknownDbType(String),

    /// Value cannot be written as a literal (S004)
    #[error("[S004] Cannot format {0} as a SQL literal")]
    UnformattableLiteral(String),

    /// Runtime type has no provider representation (S005)
    #[error("[S005] Type '{0}' has no database representation")]
    NoProviderType(String),

    /// Unknown dialect name (S006)
    #[error("[S006] Unknown dialect: {0}")]
    UnknownDialect(String),
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
