//! # tradelens-query
//!
//! Relevance engine for TradeLens. Scores star-schema tables against a
//! natural-language trading question and turns the result into join paths,
//! query completions and SQL text.
//!
//! Includes:
//! - Relevance scorer shared by the graph and in-memory backends
//! - [`RelevanceEngine`] with connect-once backend selection and permanent fallback
//! - Star join-path resolver
//! - Query suggestions
//! - SQL text assembler
//! - Result formatter (JSON, Table, Markdown) and ER diagram export

pub mod backend;
pub mod diagram;
pub mod engine;
pub mod formatter;
pub mod join_path;
pub mod scorer;
pub mod sql;
pub mod suggest;

pub use backend::{GraphBackend, InMemoryBackend, RelevanceBackend};
pub use diagram::SchemaDiagram;
pub use engine::RelevanceEngine;
pub use formatter::{format_records, format_relevance, format_results, OutputFormat, ResultSet};
pub use join_path::resolve_star_join_path;
pub use scorer::{RelevanceScorer, SchemaGraph};
pub use sql::{AssembledSql, SqlAssembler, SqlPlan};
pub use suggest::query_suggestions;
