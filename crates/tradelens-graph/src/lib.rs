//! # tradelens-graph
//!
//! Persistent schema graph store for TradeLens, kept in SQLite.
//!
//! Holds the same information as the static metadata, seeded once with
//! [`GraphStore::seed`]:
//! - `schema_tables` with per-table query telemetry
//! - `relationships`, one edge per fact foreign key
//! - `keyword_weights`, the keyword → table weight table
//!
//! Every failure is reported as a [`GraphError`] so callers can fall back to
//! in-memory scoring.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use serde::Serialize;

use tradelens_core::error::GraphError;
use tradelens_core::keywords::KeywordWeights;
use tradelens_core::relevance::RelatedTable;
use tradelens_core::schema::{StarSchema, TableKind};

/// Handle to the SQLite schema graph.
pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    /// Open or create a graph store at `path` and ensure its tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Unavailable`] if the file cannot be opened.
    pub fn create(path: &Path) -> Result<Self, GraphError> {
        let conn = Connection::open(path).map_err(classify)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    /// Connect to an existing, seeded graph store.
    ///
    /// Never creates the file. `timeout` bounds how long a query waits on a
    /// locked database before failing with [`GraphError::Timeout`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Unavailable`] if the file is missing or not a
    /// database, and [`GraphError::Malformed`] if it holds no schema graph.
    pub fn connect(path: &Path, timeout: Duration) -> Result<Self, GraphError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(classify)?;
        conn.busy_timeout(timeout).map_err(classify)?;

        let store = Self { conn };
        let tables = store
            .table_count()
            .map_err(|e| GraphError::Malformed(format!("schema graph missing: {e}")))?;
        if tables == 0 {
            return Err(GraphError::Malformed("schema graph is empty".to_string()));
        }
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Query`] if schema creation fails.
    pub fn in_memory() -> Result<Self, GraphError> {
        let conn = Connection::open_in_memory().map_err(classify)?;
        let store = Self { conn };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), GraphError> {
        self.conn
            .execute_batch(
                "
            CREATE TABLE IF NOT EXISTS schema_tables (
                name TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                query_count INTEGER NOT NULL DEFAULT 0,
                last_queried TEXT
            );

            CREATE TABLE IF NOT EXISTS relationships (
                source TEXT NOT NULL,
                target TEXT NOT NULL,
                label TEXT NOT NULL,
                weight REAL NOT NULL DEFAULT 1.0,
                ordinal INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (source, target, label)
            );

            CREATE TABLE IF NOT EXISTS keyword_weights (
                keyword TEXT NOT NULL,
                table_name TEXT NOT NULL,
                weight REAL NOT NULL,
                PRIMARY KEY (keyword, table_name)
            );

            CREATE INDEX IF NOT EXISTS idx_relationships_target ON relationships(target);
            ",
            )
            .map_err(classify)?;
        Ok(())
    }

    /// Load tables, relationships and keyword weights into the store.
    ///
    /// Existing rows for the same keys are replaced; telemetry counters of
    /// tables already present are kept.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if any insert fails; nothing is written then.
    pub fn seed(&self, schema: &StarSchema, weights: &KeywordWeights) -> Result<(), GraphError> {
        let tx = self.conn.unchecked_transaction().map_err(classify)?;

        for table in schema.tables() {
            tx.execute(
                "INSERT INTO schema_tables (name, kind) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET kind = excluded.kind",
                params![table.name, table.kind.as_str()],
            )
            .map_err(classify)?;
        }

        for (ordinal, rel) in schema.relationships().iter().enumerate() {
            tx.execute(
                "INSERT OR REPLACE INTO relationships (source, target, label, weight, ordinal)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![rel.source, rel.target, rel.label, rel.weight, ordinal as i64],
            )
            .map_err(classify)?;
        }

        for (keyword, table, weight) in weights.iter() {
            tx.execute(
                "INSERT OR REPLACE INTO keyword_weights (keyword, table_name, weight)
                 VALUES (?1, ?2, ?3)",
                params![keyword, table, weight],
            )
            .map_err(classify)?;
        }

        tx.commit().map_err(classify)?;
        tracing::info!(
            tables = schema.tables().len(),
            relationships = schema.relationships().len(),
            keywords = weights.len(),
            "seeded schema graph"
        );
        Ok(())
    }

    /// Per-table weights stored for `keyword`, ordered by table name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Malformed`] if a stored weight is outside `[0, 1]`.
    pub fn keyword_weights(&self, keyword: &str) -> Result<Vec<(String, f64)>, GraphError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT table_name, weight FROM keyword_weights
                 WHERE keyword = ?1
                 ORDER BY table_name",
            )
            .map_err(classify)?;

        let rows = stmt
            .query_map(params![keyword], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(classify)?
            .collect::<std::result::Result<Vec<(String, f64)>, _>>()
            .map_err(classify)?;

        if let Some((table, weight)) = rows.iter().find(|(_, w)| !(0.0..=1.0).contains(w)) {
            return Err(GraphError::Malformed(format!(
                "weight {weight} for '{keyword}' on '{table}'"
            )));
        }
        Ok(rows)
    }

    /// Tables one hop away from `table`, in either edge direction.
    ///
    /// Ordered like the fact table's foreign-key columns, matching
    /// [`StarSchema::neighbors`].
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the query fails.
    pub fn neighbors(&self, table: &str) -> Result<Vec<RelatedTable>, GraphError> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT target, label, weight, ordinal FROM relationships WHERE source = ?1
                 UNION ALL
                 SELECT source, label, weight, ordinal FROM relationships WHERE target = ?1
                 ORDER BY 4",
            )
            .map_err(classify)?;

        let related = stmt
            .query_map(params![table], |row| {
                Ok(RelatedTable {
                    table: row.get(0)?,
                    relationship: row.get(1)?,
                    weight: row.get(2)?,
                })
            })
            .map_err(classify)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify)?;

        Ok(related)
    }

    /// Shortest path from `from` to `to` over the relationship graph (BFS).
    ///
    /// Returns both endpoints inclusive, `Some(vec![from])` when they are the
    /// same table, and `None` when `to` is unreachable.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if a neighbour query fails.
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<Option<Vec<String>>, GraphError> {
        if from == to {
            return Ok(Some(vec![from.to_string()]));
        }

        let mut parent: HashMap<String, String> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        visited.insert(from.to_string());
        queue.push_back(from.to_string());

        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(&current)? {
                if !visited.insert(next.table.clone()) {
                    continue;
                }
                parent.insert(next.table.clone(), current.clone());
                if next.table == to {
                    let mut path = vec![to.to_string()];
                    let mut node = to;
                    while let Some(prev) = parent.get(node) {
                        path.push(prev.clone());
                        node = prev.as_str();
                    }
                    path.reverse();
                    return Ok(Some(path));
                }
                queue.push_back(next.table);
            }
        }

        Ok(None)
    }

    /// Bump `query_count` and stamp `last_queried` for each table.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if an update fails.
    pub fn record_hits<S: AsRef<str>>(&self, tables: &[S]) -> Result<(), GraphError> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut stmt = self
            .conn
            .prepare_cached(
                "UPDATE schema_tables
                 SET query_count = query_count + 1, last_queried = ?2
                 WHERE name = ?1",
            )
            .map_err(classify)?;
        for table in tables {
            stmt.execute(params![table.as_ref(), now]).map_err(classify)?;
        }
        Ok(())
    }

    /// Telemetry for every stored table, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Malformed`] for an unknown table kind.
    pub fn table_stats(&self) -> Result<Vec<TableStats>, GraphError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, kind, query_count, last_queried
                 FROM schema_tables
                 ORDER BY name",
            )
            .map_err(classify)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .map_err(classify)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(classify)?;

        rows.into_iter()
            .map(|(name, kind, count, last_queried)| {
                let kind = TableKind::parse(&kind).ok_or_else(|| {
                    GraphError::Malformed(format!("table '{name}' has unknown kind '{kind}'"))
                })?;
                Ok(TableStats {
                    name,
                    kind,
                    query_count: count.max(0) as u64,
                    last_queried,
                })
            })
            .collect()
    }

    /// Number of tables in the store.
    ///
    /// # Errors
    ///
    /// Returns a [`GraphError`] if the query fails.
    pub fn table_count(&self) -> Result<u64, GraphError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM schema_tables", [], |row| row.get(0))
            .map_err(classify)?;
        Ok(count as u64)
    }
}

/// Query telemetry for one schema table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStats {
    pub name: String,
    pub kind: TableKind,
    pub query_count: u64,
    pub last_queried: Option<String>,
}

/// Map a SQLite failure onto the graph error taxonomy.
fn classify(e: rusqlite::Error) -> GraphError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
            GraphError::Timeout(e.to_string())
        }
        Some(ErrorCode::CannotOpen | ErrorCode::NotADatabase | ErrorCode::PermissionDenied) => {
            GraphError::Unavailable(e.to_string())
        }
        _ => GraphError::Query(e.to_string()),
    }
}
