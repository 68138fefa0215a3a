//! The relevance engine: one entry point over whichever backend is live.
//!
//! The backend is chosen once, at construction. Any [`GraphError`] from the
//! graph backend flips the engine into degraded mode for the rest of the
//! process; every later call goes straight to the in-memory backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tradelens_core::catalog::Catalog;
use tradelens_core::config::{ScoringSettings, Settings};
use tradelens_core::context::{extract_query_context, QueryContext};
use tradelens_core::error::{GraphError, Result};
use tradelens_core::keywords::KeywordWeights;
use tradelens_core::relevance::TableRelevance;
use tradelens_core::schema::StarSchema;
use tradelens_graph::GraphStore;

use crate::backend::{GraphBackend, InMemoryBackend, RelevanceBackend};
use crate::sql::{AssembledSql, SqlAssembler};
use crate::suggest::query_suggestions;

/// Scores tables, resolves joins and assembles SQL for trading queries.
pub struct RelevanceEngine {
    schema: Arc<StarSchema>,
    weights: Arc<KeywordWeights>,
    settings: ScoringSettings,
    primary: Option<Box<dyn RelevanceBackend>>,
    fallback: InMemoryBackend,
    degraded: AtomicBool,
}

impl RelevanceEngine {
    /// Engine over the static trading schema with no graph store.
    ///
    /// # Errors
    ///
    /// Returns [`TradelensError::Schema`](tradelens_core::error::TradelensError::Schema)
    /// if the built-in catalog is inconsistent.
    pub fn in_memory(settings: ScoringSettings) -> Result<Self> {
        Ok(Self::build(Catalog::trading()?, None, settings))
    }

    /// Engine that tries `backend` first and falls back to in-memory scoring.
    ///
    /// # Errors
    ///
    /// Same as [`RelevanceEngine::in_memory`].
    pub fn with_backend(
        backend: Box<dyn RelevanceBackend>,
        settings: ScoringSettings,
    ) -> Result<Self> {
        Ok(Self::build(Catalog::trading()?, Some(backend), settings))
    }

    /// Connect to the configured graph store, or run in memory.
    ///
    /// A missing path selects the in-memory backend. A store that cannot be
    /// opened is logged and also selects it.
    ///
    /// # Errors
    ///
    /// Fails only when the built-in catalog is inconsistent; graph store
    /// problems never surface here.
    pub fn connect(settings: &Settings) -> Result<Self> {
        let catalog = Catalog::trading()?;

        let primary: Option<Box<dyn RelevanceBackend>> = match settings.graph.path.as_deref() {
            None => {
                tracing::info!("no graph store configured; using in-memory backend");
                None
            }
            Some(path) => match GraphStore::connect(path, settings.graph.timeout()) {
                Ok(store) => {
                    tracing::info!(path = %path.display(), "connected to graph store");
                    Some(Box::new(GraphBackend::new(
                        store,
                        catalog.schema.clone(),
                        settings.scoring.clone(),
                    )))
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "graph store unavailable; using in-memory backend"
                    );
                    None
                }
            },
        };

        Ok(Self::build(catalog, primary, settings.scoring.clone()))
    }

    fn build(
        catalog: Catalog,
        primary: Option<Box<dyn RelevanceBackend>>,
        settings: ScoringSettings,
    ) -> Self {
        let Catalog { schema, weights } = catalog;
        let fallback = InMemoryBackend::new(schema.clone(), weights.clone(), settings.clone());
        Self {
            schema,
            weights,
            settings,
            primary,
            fallback,
            degraded: AtomicBool::new(false),
        }
    }

    /// Name of the backend answering calls right now.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        match self.live_primary() {
            Some(backend) => backend.name(),
            None => self.fallback.name(),
        }
    }

    /// Whether a graph failure has forced the in-memory backend.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn schema(&self) -> &StarSchema {
        &self.schema
    }

    #[must_use]
    pub fn keyword_weights(&self) -> &KeywordWeights {
        &self.weights
    }

    /// Extract the scoring signals from `query`.
    #[must_use]
    pub fn extract_query_context(&self, query: &str) -> QueryContext {
        extract_query_context(query, &self.weights)
    }

    /// Ranked relevance of every table for `ctx`.
    #[must_use]
    pub fn score_table_relevance(&self, ctx: &QueryContext) -> Vec<TableRelevance> {
        if let Some(backend) = self.live_primary() {
            match backend.score_table_relevance(ctx) {
                Ok(scores) => return scores,
                Err(e) => self.degrade(backend.name(), &e),
            }
        }
        self.fallback.score(ctx)
    }

    /// Join order for `tables`, fact table first, without duplicates.
    #[must_use]
    pub fn resolve_join_path(&self, tables: &[String]) -> Vec<String> {
        if let Some(backend) = self.live_primary() {
            match backend.resolve_join_path(tables) {
                Ok(path) => return path,
                Err(e) => self.degrade(backend.name(), &e),
            }
        }
        self.fallback.join_path(tables)
    }

    /// Completions for a partially typed query.
    #[must_use]
    pub fn get_query_suggestions(&self, partial: &str) -> Vec<String> {
        if partial.trim().is_empty() {
            return Vec::new();
        }
        let ctx = self.extract_query_context(partial);
        let scores = self.score_table_relevance(&ctx);
        query_suggestions(partial, scores.first(), self.settings.max_suggestions)
    }

    /// Assemble SQL text answering `query`.
    #[must_use]
    pub fn assemble_sql(&self, query: &str) -> AssembledSql {
        let ctx = self.extract_query_context(query);
        let relevance = self.score_table_relevance(&ctx);

        let assembler = SqlAssembler::new(&self.schema, &self.weights);
        let plan = assembler.plan(query, &ctx, &relevance);
        let join_path = self.resolve_join_path(&plan.tables);
        let sql = assembler.render(&plan, &join_path);

        AssembledSql {
            sql,
            join_path,
            plan,
        }
    }

    fn live_primary(&self) -> Option<&dyn RelevanceBackend> {
        if self.is_degraded() {
            return None;
        }
        self.primary.as_deref()
    }

    fn degrade(&self, backend: &str, error: &GraphError) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                backend,
                error = %error,
                "backend failed; falling back to in-memory for the rest of the process"
            );
        }
    }
}
