//! Relevance result types produced by the scorer.

use serde::{Deserialize, Serialize};

/// A one-hop neighbour of a table in the schema graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedTable {
    pub table: String,
    /// Join label, the fact foreign-key column that links the two tables.
    pub relationship: String,
    pub weight: f64,
}

/// How relevant one table is to a natural-language query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRelevance {
    pub table: String,
    /// Always within `[0, 1]`.
    pub relevance_score: f64,
    /// Human-readable contributions, in the order they were applied.
    pub reasons: Vec<String>,
    pub related_tables: Vec<RelatedTable>,
    pub suggested_columns: Vec<String>,
}

impl TableRelevance {
    /// A zero-score entry with no reasons yet.
    #[must_use]
    pub fn empty(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            relevance_score: 0.0,
            reasons: Vec::new(),
            related_tables: Vec::new(),
            suggested_columns: Vec::new(),
        }
    }

    /// Add `amount` to the score and record why.
    pub fn boost(&mut self, amount: f64, reason: impl Into<String>) {
        self.relevance_score += amount;
        self.reasons.push(reason.into());
    }

    #[must_use]
    pub fn is_relevant(&self) -> bool {
        self.relevance_score > 0.0
    }
}
