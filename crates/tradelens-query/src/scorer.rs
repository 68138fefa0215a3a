//! Table relevance scoring.
//!
//! A single pass over a [`QueryContext`]: keyword weights, then one-hop
//! relationship boosts, then aggregation and time boosts. Scores are clamped
//! with `min(score, 1.0)`; ties and saturation are expected.

use std::collections::{BTreeSet, HashMap};

use tradelens_core::config::ScoringSettings;
use tradelens_core::context::QueryContext;
use tradelens_core::error::GraphError;
use tradelens_core::relevance::{RelatedTable, TableRelevance};
use tradelens_core::schema::{StarSchema, TableMetadata, TIME_DIMENSION};

/// Source of keyword weights and adjacency consulted while scoring.
pub trait SchemaGraph {
    /// `(table, weight)` pairs for a keyword; empty if unknown.
    fn keyword_weights(&self, keyword: &str) -> Result<Vec<(String, f64)>, GraphError>;

    /// One-hop neighbours of `table`.
    fn neighbors(&self, table: &str) -> Result<Vec<RelatedTable>, GraphError>;
}

/// Scores every table of a schema against a query context.
pub struct RelevanceScorer<'a> {
    schema: &'a StarSchema,
    settings: &'a ScoringSettings,
    keyword_factor: f64,
}

impl<'a> RelevanceScorer<'a> {
    /// `keyword_factor` scales every keyword weight before it is added.
    #[must_use]
    pub fn new(schema: &'a StarSchema, settings: &'a ScoringSettings, keyword_factor: f64) -> Self {
        Self {
            schema,
            settings,
            keyword_factor,
        }
    }

    /// Rank the schema's tables for `ctx`, highest score first.
    ///
    /// Tables scoring zero are omitted; a context without keyword matches
    /// yields an empty list.
    ///
    /// # Errors
    ///
    /// Propagates errors from `graph`, and returns [`GraphError::Malformed`]
    /// when it names a table the schema does not have.
    pub fn score<G>(&self, ctx: &QueryContext, graph: &G) -> Result<Vec<TableRelevance>, GraphError>
    where
        G: SchemaGraph + ?Sized,
    {
        if ctx.keywords.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores: Vec<TableRelevance> = self
            .schema
            .tables()
            .iter()
            .map(|t| TableRelevance::empty(&t.name))
            .collect();

        for keyword in &ctx.keywords {
            for (table, weight) in graph.keyword_weights(keyword)? {
                let entry = lookup(&mut scores, &table).ok_or_else(|| {
                    GraphError::Malformed(format!(
                        "keyword '{keyword}' weights unknown table '{table}'"
                    ))
                })?;
                entry.boost(
                    weight * self.keyword_factor,
                    format!("matched keyword '{keyword}' (weight {weight:.2})"),
                );
            }
        }

        let mut adjacency: HashMap<String, Vec<RelatedTable>> = HashMap::new();
        for table in self.schema.tables() {
            adjacency.insert(table.name.clone(), graph.neighbors(&table.name)?);
        }

        // Snapshot first so boosts do not cascade through the graph.
        let sources: Vec<String> = scores
            .iter()
            .filter(|s| s.is_relevant())
            .map(|s| s.table.clone())
            .collect();
        for source in &sources {
            for related in adjacency.get(source).map(Vec::as_slice).unwrap_or_default() {
                let entry = lookup(&mut scores, &related.table).ok_or_else(|| {
                    GraphError::Malformed(format!(
                        "relationship '{}' joins unknown table '{}'",
                        related.relationship, related.table
                    ))
                })?;
                entry.boost(
                    self.settings.relationship_boost,
                    format!("related to {source} via {}", related.relationship),
                );
            }
        }

        if !ctx.aggregation_hints.is_empty() {
            let fact = self.schema.fact_table_name();
            if let Some(entry) = lookup(&mut scores, fact) {
                entry.boost(self.settings.aggregation_boost, "contains aggregatable metrics");
            }
        }

        if let Some(hint) = ctx.time_hint {
            if let Some(entry) = lookup(&mut scores, TIME_DIMENSION) {
                entry.boost(
                    self.settings.time_boost,
                    format!("time context detected ({})", hint.as_str()),
                );
            }
        }

        scores.retain(TableRelevance::is_relevant);
        for entry in &mut scores {
            entry.relevance_score = entry.relevance_score.min(1.0);
            entry.related_tables = adjacency.remove(&entry.table).unwrap_or_default();
            if let Some(meta) = self.schema.table(&entry.table) {
                entry.suggested_columns =
                    suggested_columns(meta, &ctx.keywords, self.settings.max_suggested_columns);
            }
        }

        scores.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.table.cmp(&b.table))
        });

        tracing::debug!(
            tables = scores.len(),
            top = scores.first().map(|s| s.table.as_str()),
            "scored table relevance"
        );
        Ok(scores)
    }
}

fn lookup<'s>(scores: &'s mut [TableRelevance], table: &str) -> Option<&'s mut TableRelevance> {
    scores.iter_mut().find(|s| s.table == table)
}

/// Key columns and columns named exactly like a matched keyword, in schema order.
fn suggested_columns(table: &TableMetadata, keywords: &BTreeSet<String>, max: usize) -> Vec<String> {
    table
        .columns
        .iter()
        .filter(|c| c.is_key() || keywords.contains(&c.name))
        .take(max)
        .map(|c| c.name.clone())
        .collect()
}
