//! Error types for TradeLens.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level result type for TradeLens operations.
pub type Result<T> = std::result::Result<T, TradelensError>;

/// Top-level error type for TradeLens.
#[derive(Debug, Error)]
pub enum TradelensError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("graph store error: {0}")]
    Graph(#[from] GraphError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Violations of the star-schema contract, detected when metadata is built.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("duplicate table '{0}'")]
    DuplicateTable(String),

    #[error("schema has no fact table")]
    MissingFactTable,

    #[error("schema has more than one fact table: '{first}' and '{second}'")]
    MultipleFactTables { first: String, second: String },

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("foreign key '{table}.{column}' does not name a dimension table")]
    DanglingForeignKey { table: String, column: String },

    #[error("dimension '{0}' is not referenced by any fact foreign key")]
    DimensionNotReferenced(String),

    #[error("dimension '{dimension}' is referenced by several fact columns: {columns:?}")]
    DimensionReferencedTwice {
        dimension: String,
        columns: Vec<String>,
    },

    #[error("weight {weight} for keyword '{keyword}' on '{table}' is outside [0, 1]")]
    WeightOutOfRange {
        keyword: String,
        table: String,
        weight: f64,
    },
}

/// Failures talking to the persistent schema graph store.
///
/// Every variant is recoverable: callers fall back to the in-memory backend.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    #[error("graph store timed out: {0}")]
    Timeout(String),

    #[error("malformed graph store response: {0}")]
    Malformed(String),

    #[error("graph store query failed: {0}")]
    Query(String),
}

/// Errors loading or validating [`Settings`](crate::config::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid setting '{key}': {reason}")]
    Invalid { key: String, reason: String },
}
