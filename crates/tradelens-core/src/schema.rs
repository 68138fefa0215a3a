//! Static metadata for the trading star schema.
//!
//! One fact table (`fact_trading_orders`) references five dimension tables,
//! each through exactly one foreign-key column. The schema graph has one
//! edge per such foreign key and nothing else.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::relevance::RelatedTable;

/// Name of the fact table every join goes through.
pub const FACT_TABLE: &str = "fact_trading_orders";

/// Name of the dimension that receives the time-context boost.
pub const TIME_DIMENSION: &str = "dim_time";

/// Role of a table in the star schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Fact,
    Dimension,
}

impl TableKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Fact => "fact",
            TableKind::Dimension => "dimension",
        }
    }

    /// Parse the stored form produced by [`TableKind::as_str`].
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fact" => Some(TableKind::Fact),
            "dimension" => Some(TableKind::Dimension),
            _ => None,
        }
    }
}

/// A column of a schema table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub is_foreign_key: bool,
    /// For foreign keys: the dimension table this column points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

impl ColumnMetadata {
    #[must_use]
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_primary_key: false,
            is_foreign_key: false,
            references: None,
        }
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, table: &str) -> Self {
        self.is_foreign_key = true;
        self.references = Some(table.to_string());
        self
    }

    /// Whether this column is part of a join key (primary or foreign).
    #[must_use]
    pub fn is_key(&self) -> bool {
        self.is_primary_key || self.is_foreign_key
    }
}

/// A table in the star schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    #[must_use]
    pub fn new(name: &str, kind: TableKind, columns: Vec<ColumnMetadata>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            columns,
        }
    }

    #[must_use]
    pub fn primary_key(&self) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.is_primary_key)
    }
}

/// An edge of the schema graph: the fact table joined to one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Table holding the foreign key (always the fact table).
    pub source: String,
    /// Referenced dimension table.
    pub target: String,
    /// Foreign-key column on `source`.
    pub label: String,
    pub weight: f64,
}

/// Validated, immutable star-schema metadata.
#[derive(Debug, Clone)]
pub struct StarSchema {
    tables: Vec<TableMetadata>,
    fact_index: usize,
    relationships: Vec<Relationship>,
}

impl StarSchema {
    /// Build a schema from table metadata, enforcing the star-schema contract.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if table names repeat, there is not exactly
    /// one fact table, a foreign key names something other than a dimension,
    /// or a dimension is not referenced by exactly one fact column.
    pub fn new(tables: Vec<TableMetadata>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for table in &tables {
            if !seen.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
        }

        let mut facts = tables.iter().filter(|t| t.kind == TableKind::Fact);
        let fact = facts.next().ok_or(SchemaError::MissingFactTable)?;
        if let Some(second) = facts.next() {
            return Err(SchemaError::MultipleFactTables {
                first: fact.name.clone(),
                second: second.name.clone(),
            });
        }

        let dimensions: HashSet<&str> = tables
            .iter()
            .filter(|t| t.kind == TableKind::Dimension)
            .map(|t| t.name.as_str())
            .collect();

        let mut referenced_by: HashMap<&str, Vec<String>> = HashMap::new();
        for column in fact.columns.iter().filter(|c| c.is_foreign_key) {
            match column.references.as_deref() {
                Some(target) if dimensions.contains(target) => {
                    referenced_by
                        .entry(target)
                        .or_default()
                        .push(column.name.clone());
                }
                _ => {
                    return Err(SchemaError::DanglingForeignKey {
                        table: fact.name.clone(),
                        column: column.name.clone(),
                    })
                }
            }
        }

        for table in tables.iter().filter(|t| t.kind == TableKind::Dimension) {
            match referenced_by.get(table.name.as_str()) {
                None => return Err(SchemaError::DimensionNotReferenced(table.name.clone())),
                Some(columns) if columns.len() > 1 => {
                    return Err(SchemaError::DimensionReferencedTwice {
                        dimension: table.name.clone(),
                        columns: columns.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(Self::build(tables))
    }

    /// The built-in six-table trading schema, checked like any other.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if [`trading_tables`] breaks the star contract.
    pub fn trading() -> Result<Self, SchemaError> {
        Self::new(trading_tables())
    }

    fn build(tables: Vec<TableMetadata>) -> Self {
        let fact_index = tables
            .iter()
            .position(|t| t.kind == TableKind::Fact)
            .unwrap_or(0);
        let fact = &tables[fact_index];
        let relationships = fact
            .columns
            .iter()
            .filter_map(|c| {
                c.references.as_ref().map(|target| Relationship {
                    source: fact.name.clone(),
                    target: target.clone(),
                    label: c.name.clone(),
                    weight: 1.0,
                })
            })
            .collect();

        Self {
            tables,
            fact_index,
            relationships,
        }
    }

    #[must_use]
    pub fn tables(&self) -> &[TableMetadata] {
        &self.tables
    }

    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    #[must_use]
    pub fn fact_table(&self) -> &TableMetadata {
        &self.tables[self.fact_index]
    }

    #[must_use]
    pub fn fact_table_name(&self) -> &str {
        &self.fact_table().name
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &TableMetadata> {
        self.tables
            .iter()
            .filter(|t| t.kind == TableKind::Dimension)
    }

    #[must_use]
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Tables directly joined to `table`, in relationship order.
    #[must_use]
    pub fn neighbors(&self, table: &str) -> Vec<RelatedTable> {
        self.relationships
            .iter()
            .filter_map(|r| {
                let other = if r.source == table {
                    &r.target
                } else if r.target == table {
                    &r.source
                } else {
                    return None;
                };
                Some(RelatedTable {
                    table: other.clone(),
                    relationship: r.label.clone(),
                    weight: r.weight,
                })
            })
            .collect()
    }

    /// The foreign-key column on the fact table that references `dimension`.
    #[must_use]
    pub fn join_column(&self, dimension: &str) -> Option<&str> {
        self.relationships
            .iter()
            .find(|r| r.target == dimension)
            .map(|r| r.label.as_str())
    }
}

/// Table metadata of the trading analytics warehouse.
#[must_use]
pub fn trading_tables() -> Vec<TableMetadata> {
    use ColumnMetadata as C;

    vec![
        TableMetadata::new(
            FACT_TABLE,
            TableKind::Fact,
            vec![
                C::new("order_id", "INTEGER").primary_key(),
                C::new("security_id", "INTEGER").foreign_key("dim_security"),
                C::new("trader_id", "INTEGER").foreign_key("dim_trader"),
                C::new("time_id", "INTEGER").foreign_key(TIME_DIMENSION),
                C::new("counterparty_id", "INTEGER").foreign_key("dim_counterparty"),
                C::new("order_type_id", "INTEGER").foreign_key("dim_order_type"),
                C::new("quantity", "INTEGER"),
                C::new("price", "DECIMAL(18,4)"),
                C::new("notional_value", "DECIMAL(18,2)"),
                C::new("pnl", "DECIMAL(18,2)"),
                C::new("commission", "DECIMAL(18,2)"),
                C::new("status", "VARCHAR(20)"),
                C::new("execution_time", "TIMESTAMP"),
            ],
        ),
        TableMetadata::new(
            "dim_security",
            TableKind::Dimension,
            vec![
                C::new("security_id", "INTEGER").primary_key(),
                C::new("symbol", "VARCHAR(12)"),
                C::new("security_name", "VARCHAR(100)"),
                C::new("sector", "VARCHAR(50)"),
                C::new("asset_class", "VARCHAR(30)"),
                C::new("exchange", "VARCHAR(20)"),
                C::new("currency", "CHAR(3)"),
            ],
        ),
        TableMetadata::new(
            "dim_trader",
            TableKind::Dimension,
            vec![
                C::new("trader_id", "INTEGER").primary_key(),
                C::new("trader_name", "VARCHAR(100)"),
                C::new("desk", "VARCHAR(50)"),
                C::new("region", "VARCHAR(30)"),
                C::new("experience_level", "VARCHAR(20)"),
            ],
        ),
        TableMetadata::new(
            TIME_DIMENSION,
            TableKind::Dimension,
            vec![
                C::new("time_id", "INTEGER").primary_key(),
                C::new("trade_date", "DATE"),
                C::new("hour", "INTEGER"),
                C::new("day_of_week", "VARCHAR(10)"),
                C::new("month", "INTEGER"),
                C::new("quarter", "INTEGER"),
                C::new("year", "INTEGER"),
                C::new("is_trading_day", "BOOLEAN"),
            ],
        ),
        TableMetadata::new(
            "dim_counterparty",
            TableKind::Dimension,
            vec![
                C::new("counterparty_id", "INTEGER").primary_key(),
                C::new("counterparty_name", "VARCHAR(100)"),
                C::new("counterparty_type", "VARCHAR(30)"),
                C::new("credit_rating", "VARCHAR(5)"),
                C::new("country", "VARCHAR(50)"),
            ],
        ),
        TableMetadata::new(
            "dim_order_type",
            TableKind::Dimension,
            vec![
                C::new("order_type_id", "INTEGER").primary_key(),
                C::new("order_type_name", "VARCHAR(30)"),
                C::new("side", "VARCHAR(4)"),
                C::new("time_in_force", "VARCHAR(10)"),
                C::new("description", "VARCHAR(200)"),
            ],
        ),
    ]
}
