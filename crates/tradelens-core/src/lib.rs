//! # tradelens-core
//!
//! Core types for the TradeLens table-relevance engine.
//!
//! This crate defines the static metadata and per-query types used across
//! all other TradeLens crates:
//! - [`Catalog`]: the validated trading schema with its keyword table
//! - [`StarSchema`]: validated fact/dimension metadata and its join graph
//! - [`KeywordWeights`]: the hand-authored keyword → table weight table
//! - [`QueryContext`] and [`extract_query_context`]: signals derived from a query
//! - [`TableRelevance`]: scored output of the relevance scorer
//! - [`Settings`]: TOML configuration
//! - Error hierarchy ([`TradelensError`], [`SchemaError`], [`GraphError`], [`ConfigError`])

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod keywords;
pub mod relevance;
pub mod schema;

pub use catalog::Catalog;
pub use config::{GraphSettings, ScoringSettings, Settings};
pub use context::{extract_query_context, AggregateFn, QueryContext, TimeHint};
pub use error::{ConfigError, GraphError, Result, SchemaError, TradelensError};
pub use keywords::KeywordWeights;
pub use relevance::{RelatedTable, TableRelevance};
pub use schema::{
    ColumnMetadata, Relationship, StarSchema, TableKind, TableMetadata, FACT_TABLE,
    TIME_DIMENSION,
};
