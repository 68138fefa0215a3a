//! Relevance backends: the persistent graph store and the in-memory star.
//!
//! Both satisfy [`RelevanceBackend`]. The graph backend reads keyword weights
//! and adjacency from SQLite and records per-table telemetry; the in-memory
//! backend uses the static metadata and cannot fail.

use std::sync::{Arc, Mutex};

use tradelens_core::config::ScoringSettings;
use tradelens_core::context::QueryContext;
use tradelens_core::error::GraphError;
use tradelens_core::keywords::KeywordWeights;
use tradelens_core::relevance::{RelatedTable, TableRelevance};
use tradelens_core::schema::StarSchema;
use tradelens_graph::GraphStore;

use crate::join_path::resolve_star_join_path;
use crate::scorer::{RelevanceScorer, SchemaGraph};

/// Capability shared by every way of answering relevance queries.
pub trait RelevanceBackend: Send + Sync {
    /// Short name used in logs and CLI output.
    fn name(&self) -> &'static str;

    /// Ranked, clamped relevance for every table scoring above zero.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] when the backing store fails; callers are
    /// expected to fall back rather than surface it.
    fn score_table_relevance(&self, ctx: &QueryContext) -> Result<Vec<TableRelevance>, GraphError>;

    /// Join order for `tables`, fact table first, without duplicates.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] when the backing store fails.
    fn resolve_join_path(&self, tables: &[String]) -> Result<Vec<String>, GraphError>;
}

/// Scores against the static schema and keyword table.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    schema: Arc<StarSchema>,
    weights: Arc<KeywordWeights>,
    settings: ScoringSettings,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new(
        schema: Arc<StarSchema>,
        weights: Arc<KeywordWeights>,
        settings: ScoringSettings,
    ) -> Self {
        Self {
            schema,
            weights,
            settings,
        }
    }

    /// Infallible form of [`RelevanceBackend::score_table_relevance`].
    #[must_use]
    pub fn score(&self, ctx: &QueryContext) -> Vec<TableRelevance> {
        RelevanceScorer::new(&self.schema, &self.settings, self.settings.memory_keyword_factor)
            .score(ctx, self)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "static keyword table disagrees with schema");
                Vec::new()
            })
    }

    /// Infallible form of [`RelevanceBackend::resolve_join_path`].
    #[must_use]
    pub fn join_path(&self, tables: &[String]) -> Vec<String> {
        resolve_star_join_path(self.schema.fact_table_name(), tables)
    }
}

impl SchemaGraph for InMemoryBackend {
    fn keyword_weights(&self, keyword: &str) -> Result<Vec<(String, f64)>, GraphError> {
        Ok(self
            .weights
            .get(keyword)
            .map(|tables| tables.iter().map(|(t, w)| (t.clone(), *w)).collect())
            .unwrap_or_default())
    }

    fn neighbors(&self, table: &str) -> Result<Vec<RelatedTable>, GraphError> {
        Ok(self.schema.neighbors(table))
    }
}

impl RelevanceBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    fn score_table_relevance(&self, ctx: &QueryContext) -> Result<Vec<TableRelevance>, GraphError> {
        Ok(self.score(ctx))
    }

    fn resolve_join_path(&self, tables: &[String]) -> Result<Vec<String>, GraphError> {
        Ok(self.join_path(tables))
    }
}

impl SchemaGraph for GraphStore {
    fn keyword_weights(&self, keyword: &str) -> Result<Vec<(String, f64)>, GraphError> {
        GraphStore::keyword_weights(self, keyword)
    }

    fn neighbors(&self, table: &str) -> Result<Vec<RelatedTable>, GraphError> {
        GraphStore::neighbors(self, table)
    }
}

/// Scores against a connected [`GraphStore`].
pub struct GraphBackend {
    store: Mutex<GraphStore>,
    schema: Arc<StarSchema>,
    settings: ScoringSettings,
}

impl GraphBackend {
    #[must_use]
    pub fn new(store: GraphStore, schema: Arc<StarSchema>, settings: ScoringSettings) -> Self {
        Self {
            store: Mutex::new(store),
            schema,
            settings,
        }
    }

    fn with_store<T>(
        &self,
        f: impl FnOnce(&GraphStore) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let store = self
            .store
            .lock()
            .map_err(|_| GraphError::Unavailable("graph store lock poisoned".to_string()))?;
        f(&store)
    }
}

impl RelevanceBackend for GraphBackend {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn score_table_relevance(&self, ctx: &QueryContext) -> Result<Vec<TableRelevance>, GraphError> {
        self.with_store(|store| {
            let scores =
                RelevanceScorer::new(&self.schema, &self.settings, self.settings.graph_keyword_factor)
                    .score(ctx, store)?;

            if !scores.is_empty() {
                let hits: Vec<&str> = scores.iter().map(|s| s.table.as_str()).collect();
                if let Err(e) = store.record_hits(&hits) {
                    tracing::warn!(error = %e, "failed to record table telemetry");
                }
            }
            Ok(scores)
        })
    }

    fn resolve_join_path(&self, tables: &[String]) -> Result<Vec<String>, GraphError> {
        let fact = self.schema.fact_table_name();
        let mut distinct: Vec<&str> = Vec::new();
        for table in tables {
            if !distinct.contains(&table.as_str()) {
                distinct.push(table);
            }
        }
        if distinct.iter().all(|t| *t == fact) {
            return Ok(distinct.into_iter().map(str::to_string).collect());
        }

        self.with_store(|store| {
            let mut path = vec![fact.to_string()];
            for table in distinct {
                match store.shortest_path(fact, table)? {
                    Some(nodes) => {
                        for node in nodes {
                            if !path.contains(&node) {
                                path.push(node);
                            }
                        }
                    }
                    None => {
                        tracing::debug!(table, "no stored path from fact table; appending as-is");
                        if !path.iter().any(|p| p == table) {
                            path.push(table.to_string());
                        }
                    }
                }
            }
            Ok(path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tradelens_core::context::extract_query_context;
    use tradelens_core::schema::{FACT_TABLE, TIME_DIMENSION};

    fn in_memory() -> InMemoryBackend {
        InMemoryBackend::new(
            Arc::new(StarSchema::trading().unwrap()),
            Arc::new(KeywordWeights::trading()),
            ScoringSettings::default(),
        )
    }

    fn graph() -> GraphBackend {
        let store = GraphStore::in_memory().unwrap();
        store
            .seed(&StarSchema::trading().unwrap(), &KeywordWeights::trading())
            .unwrap();
        GraphBackend::new(
            store,
            Arc::new(StarSchema::trading().unwrap()),
            ScoringSettings::default(),
        )
    }

    fn ranking(results: &[TableRelevance]) -> Vec<String> {
        results.iter().map(|r| r.table.clone()).collect()
    }

    fn ctx(query: &str) -> QueryContext {
        extract_query_context(query, &KeywordWeights::trading())
    }

    #[test]
    fn backends_agree_on_ranking() {
        let memory = in_memory();
        let graph = graph();
        for query in [
            "Show me top traders by PnL",
            "What securities are trading today?",
            "total pnl by security",
            "counterparty exposure by broker",
            "average commission for limit orders yesterday",
        ] {
            let ctx = ctx(query);
            let a = memory.score_table_relevance(&ctx).unwrap();
            let b = graph.score_table_relevance(&ctx).unwrap();
            assert_eq!(ranking(&a), ranking(&b), "ranking differs for {query:?}");
        }
    }

    #[test]
    fn backends_agree_on_related_tables() {
        let memory = in_memory();
        let graph = graph();
        let ctx = ctx("pnl by trader and security");
        let a = memory.score_table_relevance(&ctx).unwrap();
        let b = graph.score_table_relevance(&ctx).unwrap();
        assert_eq!(ranking(&a), ranking(&b));
        for (m, g) in a.iter().zip(&b) {
            assert_eq!(m.related_tables, g.related_tables, "{}", m.table);
            assert_eq!(m.reasons.len(), g.reasons.len(), "{}", m.table);
        }
        let fact = a.iter().find(|r| r.table == FACT_TABLE).unwrap();
        assert_eq!(fact.related_tables[0].relationship, "security_id");
    }

    /// Where fixed boosts sit between 40% and 50% of a table's keyword
    /// weight, the two keyword factors order tables differently.
    #[test]
    fn keyword_factor_gap_reorders_mixed_queries() {
        fn rank(backend: &dyn RelevanceBackend, query: &str) -> Vec<String> {
            ranking(&backend.score_table_relevance(&ctx(query)).unwrap())
        }
        let memory = in_memory();
        let graph = graph();

        // Aggregation boost ties a 1.0 dimension keyword at 0.5.
        assert_eq!(rank(&memory, "total trader"), vec!["dim_trader", FACT_TABLE]);
        assert_eq!(rank(&graph, "total trader"), vec![FACT_TABLE, "dim_trader"]);

        // 0.2 + 0.2 on dim_time against a 0.9 fact keyword.
        assert_eq!(rank(&memory, "volume current")[..2], [FACT_TABLE, TIME_DIMENSION]);
        assert_eq!(rank(&graph, "volume current")[..2], [TIME_DIMENSION, FACT_TABLE]);

        // Both dimensions saturate at 1.0 on the in-memory backend only.
        let query = "security symbol trader desk region";
        assert_eq!(
            rank(&memory, query),
            vec!["dim_security", "dim_trader", FACT_TABLE]
        );
        assert_eq!(
            rank(&graph, query),
            vec!["dim_trader", "dim_security", FACT_TABLE]
        );
    }

    const TABLES: [&str; 6] = [
        FACT_TABLE,
        "dim_security",
        "dim_trader",
        TIME_DIMENSION,
        "dim_counterparty",
        "dim_order_type",
    ];

    const FILLER: [&str; 7] = ["show", "me", "by", "the", "for", "all", "list"];

    /// Keywords weighting only `table` that carry no aggregation marker.
    fn single_table_keywords(table: &str) -> Vec<String> {
        let weights = KeywordWeights::trading();
        let mut pool: Vec<String> = weights
            .iter()
            .filter(|(keyword, t, _)| {
                *t == table && weights.get(keyword).is_some_and(|m| m.len() == 1)
            })
            .map(|(keyword, _, _)| keyword.to_string())
            .filter(|keyword| ctx(keyword).aggregation_hints.is_empty())
            .collect();
        pool.dedup();
        pool
    }

    fn single_table_query() -> impl Strategy<Value = String> {
        prop::sample::select(TABLES.to_vec())
            .prop_flat_map(|table| {
                let pool = single_table_keywords(table);
                let max = pool.len().min(4);
                (
                    prop::sample::subsequence(pool, 1..=max),
                    prop::collection::vec(prop::sample::select(FILLER.to_vec()), 0..4),
                )
            })
            .prop_flat_map(|(keywords, filler)| {
                let mut words: Vec<String> = keywords;
                words.extend(filler.into_iter().map(str::to_string));
                Just(words).prop_shuffle()
            })
            .prop_map(|words| words.join(" "))
    }

    #[test]
    fn every_table_has_single_table_keywords() {
        for table in TABLES {
            assert!(!single_table_keywords(table).is_empty(), "{table}");
        }
        assert!(!single_table_keywords("dim_counterparty").contains(&"counterparty".to_string()));
    }

    proptest! {
        #[test]
        fn single_table_queries_rank_alike(query in single_table_query()) {
            let ctx = ctx(&query);
            prop_assert!(ctx.aggregation_hints.is_empty());
            let memory = in_memory().score_table_relevance(&ctx).unwrap();
            let graph = graph().score_table_relevance(&ctx).unwrap();
            prop_assert_eq!(ranking(&memory), ranking(&graph), "query {:?}", query);
        }
    }

    #[test]
    fn backends_use_distinct_keyword_factors() {
        let ctx = ctx("counterparty");
        let score = |results: Vec<TableRelevance>| {
            results
                .into_iter()
                .find(|r| r.table == "dim_counterparty")
                .map(|r| r.relevance_score)
                .unwrap()
        };
        let memory = score(in_memory().score_table_relevance(&ctx).unwrap());
        let graph = score(graph().score_table_relevance(&ctx).unwrap());
        assert!((memory - 0.5).abs() < 1e-9);
        assert!((graph - 0.4).abs() < 1e-9);
    }

    #[test]
    fn graph_backend_records_telemetry() {
        let graph = graph();
        graph.score_table_relevance(&ctx("desk")).unwrap();

        let stats = graph.with_store(|s| s.table_stats()).unwrap();
        let count = |name: &str| stats.iter().find(|s| s.name == name).unwrap().query_count;
        assert_eq!(count("dim_trader"), 1);
        assert_eq!(count(FACT_TABLE), 1);
        assert_eq!(count("dim_time"), 0);
    }

    #[test]
    fn telemetry_does_not_change_scores() {
        let graph = graph();
        let ctx = ctx("top traders by pnl");
        let first = graph.score_table_relevance(&ctx).unwrap();
        let second = graph.score_table_relevance(&ctx).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn backends_agree_on_join_paths() {
        let memory = in_memory();
        let graph = graph();
        let cases: Vec<Vec<String>> = vec![
            vec![],
            vec![FACT_TABLE.to_string()],
            vec!["dim_security".to_string(), "dim_trader".to_string()],
            vec![
                "dim_time".to_string(),
                FACT_TABLE.to_string(),
                "dim_time".to_string(),
                "dim_counterparty".to_string(),
            ],
            vec!["dim_venue".to_string()],
        ];
        for tables in cases {
            assert_eq!(
                memory.resolve_join_path(&tables).unwrap(),
                graph.resolve_join_path(&tables).unwrap(),
                "join path differs for {tables:?}"
            );
        }
    }

    #[test]
    fn graph_errors_surface_from_backend() {
        let store = GraphStore::in_memory().unwrap();
        // Tables present but keyword rows point at a table the schema lacks.
        store
            .seed(
                &StarSchema::trading().unwrap(),
                &KeywordWeights::new().with("trade", &[("dim_venue", 1.0)]),
            )
            .unwrap();
        let backend = GraphBackend::new(
            store,
            Arc::new(StarSchema::trading().unwrap()),
            ScoringSettings::default(),
        );
        let err = backend.score_table_relevance(&ctx("trade")).unwrap_err();
        assert!(matches!(err, GraphError::Malformed(_)));
    }
}
