//! Keyword → table weight lookup table.
//!
//! The table is hand-authored and matched by exact token. Plural and synonym
//! coverage is deliberately uneven (`securities` and `traders` are listed,
//! `executions` and `brokers` are not); no stemming is applied.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SchemaError;
use crate::schema::{StarSchema, FACT_TABLE, TIME_DIMENSION};

/// Immutable mapping from lowercase keyword to per-table weights in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordWeights {
    entries: BTreeMap<String, BTreeMap<String, f64>>,
}

impl KeywordWeights {
    /// An empty table. Use [`KeywordWeights::with`] to populate it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyword with its table weights, consuming the builder.
    #[must_use]
    pub fn with(mut self, keyword: &str, weights: &[(&str, f64)]) -> Self {
        let entry = self.entries.entry(keyword.to_lowercase()).or_default();
        for (table, weight) in weights {
            entry.insert((*table).to_string(), *weight);
        }
        self
    }

    /// The keyword table for the trading schema.
    #[must_use]
    pub fn trading() -> Self {
        const SECURITY: &str = "dim_security";
        const TRADER: &str = "dim_trader";
        const COUNTERPARTY: &str = "dim_counterparty";
        const ORDER_TYPE: &str = "dim_order_type";

        Self::new()
            // orders and measures
            .with("trade", &[(FACT_TABLE, 1.0)])
            .with("trades", &[(FACT_TABLE, 1.0)])
            .with("trading", &[(FACT_TABLE, 0.9)])
            .with("order", &[(FACT_TABLE, 1.0), (ORDER_TYPE, 0.5)])
            .with("orders", &[(FACT_TABLE, 1.0), (ORDER_TYPE, 0.5)])
            .with("execution", &[(FACT_TABLE, 0.8)])
            .with("volume", &[(FACT_TABLE, 0.9)])
            .with("quantity", &[(FACT_TABLE, 0.9)])
            .with("price", &[(FACT_TABLE, 0.8), (SECURITY, 0.3)])
            .with("pnl", &[(FACT_TABLE, 1.0)])
            .with("profit", &[(FACT_TABLE, 0.9)])
            .with("loss", &[(FACT_TABLE, 0.8)])
            .with("notional", &[(FACT_TABLE, 0.9)])
            .with("commission", &[(FACT_TABLE, 0.8)])
            .with("fees", &[(FACT_TABLE, 0.7)])
            .with("status", &[(FACT_TABLE, 0.6)])
            // securities
            .with("security", &[(SECURITY, 1.0)])
            .with("securities", &[(SECURITY, 1.0)])
            .with("stock", &[(SECURITY, 0.9)])
            .with("stocks", &[(SECURITY, 0.9)])
            .with("symbol", &[(SECURITY, 1.0)])
            .with("ticker", &[(SECURITY, 0.9)])
            .with("sector", &[(SECURITY, 0.8)])
            .with("instrument", &[(SECURITY, 0.8)])
            .with("equity", &[(SECURITY, 0.8)])
            .with("exchange", &[(SECURITY, 0.7)])
            // traders
            .with("trader", &[(TRADER, 1.0)])
            .with("traders", &[(TRADER, 1.0)])
            .with("desk", &[(TRADER, 0.9)])
            .with("region", &[(TRADER, 0.6)])
            // time
            .with("date", &[(TIME_DIMENSION, 1.0)])
            .with("time", &[(TIME_DIMENSION, 0.9)])
            .with("today", &[(TIME_DIMENSION, 0.9)])
            .with("yesterday", &[(TIME_DIMENSION, 0.9)])
            .with("daily", &[(TIME_DIMENSION, 0.8)])
            .with("month", &[(TIME_DIMENSION, 0.8)])
            .with("monthly", &[(TIME_DIMENSION, 0.8)])
            .with("quarter", &[(TIME_DIMENSION, 0.8)])
            .with("week", &[(TIME_DIMENSION, 0.7)])
            .with("year", &[(TIME_DIMENSION, 0.7)])
            .with("hour", &[(TIME_DIMENSION, 0.7)])
            // counterparties
            .with("counterparty", &[(COUNTERPARTY, 1.0)])
            .with("counterparties", &[(COUNTERPARTY, 1.0)])
            .with("broker", &[(COUNTERPARTY, 0.8)])
            .with("client", &[(COUNTERPARTY, 0.7)])
            .with("clients", &[(COUNTERPARTY, 0.7)])
            .with("rating", &[(COUNTERPARTY, 0.6)])
            // order types
            .with("buy", &[(ORDER_TYPE, 0.8)])
            .with("sell", &[(ORDER_TYPE, 0.8)])
            .with("side", &[(ORDER_TYPE, 0.7)])
            .with("limit", &[(ORDER_TYPE, 0.7)])
            .with("market", &[(ORDER_TYPE, 0.6), (SECURITY, 0.3)])
            .with("type", &[(ORDER_TYPE, 0.5)])
    }

    /// Per-table weights for `keyword`, if it is in the table.
    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&BTreeMap<String, f64>> {
        self.entries.get(keyword)
    }

    #[must_use]
    pub fn contains(&self, keyword: &str) -> bool {
        self.entries.contains_key(keyword)
    }

    /// Every `(keyword, table, weight)` triple, sorted by keyword then table.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.entries.iter().flat_map(|(keyword, tables)| {
            tables
                .iter()
                .map(move |(table, weight)| (keyword.as_str(), table.as_str(), *weight))
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every weight is in `[0, 1]` and names a table of `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::WeightOutOfRange`] or [`SchemaError::UnknownTable`].
    pub fn validate(&self, schema: &StarSchema) -> Result<(), SchemaError> {
        for (keyword, table, weight) in self.iter() {
            if !(0.0..=1.0).contains(&weight) {
                return Err(SchemaError::WeightOutOfRange {
                    keyword: keyword.to_string(),
                    table: table.to_string(),
                    weight,
                });
            }
            if !schema.contains(table) {
                return Err(SchemaError::UnknownTable(table.to_string()));
            }
        }
        Ok(())
    }
}
