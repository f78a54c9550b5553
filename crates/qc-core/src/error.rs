//! Error types for qc-core

use thiserror::Error;

/// Core error type for the query compiler
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Mapping file not found
    #[error("[E004] Mapping file not found: {path}")]
    MappingNotFound { path: String },

    /// E005: Mapping file could not be parsed
    #[error("[E005] Failed to parse mapping: {message}")]
    MappingParseError { message: String },

    /// E006: Mapping is internally inconsistent
    #[error("[E006] Invalid mapping for '{type_name}': {reason}")]
    MappingInvalid { type_name: String, reason: String },

    /// E007: Type is not mapped
    #[error("[E007] Type '{type_name}' is not mapped to a table")]
    UnmappedType { type_name: String },

    /// E008: Member is not mapped on the type
    #[error("[E008] Member '{member}' is not mapped on type '{type_name}'")]
    UnmappedMember { type_name: String, member: String },

    /// E009: Query tree could not be parsed
    #[error("[E009] Failed to parse query: {message}")]
    QueryParseError { message: String },

    /// E010: IO error while reading a file
    #[error("[E010] IO error reading {path}: {source}")]
    IoWithPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// E011: YAML error
    #[error("[E011] YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// E012: JSON error
    #[error("[E012] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
