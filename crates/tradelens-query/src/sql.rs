//! Natural-language → SQL text assembly for the trading star schema.
//!
//! Phrase rules pick grouping columns, the measure, filters and ordering;
//! the tables they need plus the strongly relevant ones are joined through
//! the fact table. This is template filling, not parsing.

use serde::Serialize;

use tradelens_core::context::{AggregateFn, QueryContext, TimeHint};
use tradelens_core::keywords::KeywordWeights;
use tradelens_core::relevance::TableRelevance;
use tradelens_core::schema::{StarSchema, FACT_TABLE, TIME_DIMENSION};

/// Relevance a table needs before it is joined without a rule asking for it.
pub const MIN_JOIN_SCORE: f64 = 0.25;

/// Row cap when the query does not ask for a ranking.
pub const DEFAULT_LIMIT: usize = 100;

/// Rank size for `top` / `bottom` without an explicit count.
pub const DEFAULT_RANK: usize = 10;

const SECURITY: &str = "dim_security";
const TRADER: &str = "dim_trader";
const COUNTERPARTY: &str = "dim_counterparty";
const ORDER_TYPE: &str = "dim_order_type";

/// A phrase (or token) that maps onto a qualified column.
struct ColumnRule {
    phrases: &'static [&'static str],
    table: &'static str,
    column: &'static str,
}

const GROUP_RULES: &[ColumnRule] = &[
    ColumnRule {
        phrases: &["by security", "by securities", "by symbol"],
        table: SECURITY,
        column: "ds.symbol",
    },
    ColumnRule {
        phrases: &["by sector"],
        table: SECURITY,
        column: "ds.sector",
    },
    ColumnRule {
        phrases: &["by trader"],
        table: TRADER,
        column: "dt.trader_name",
    },
    ColumnRule {
        phrases: &["by desk"],
        table: TRADER,
        column: "dt.desk",
    },
    ColumnRule {
        phrases: &["by counterparty", "by counterparties"],
        table: COUNTERPARTY,
        column: "dc.counterparty_name",
    },
    ColumnRule {
        phrases: &["by order type"],
        table: ORDER_TYPE,
        column: "dot.order_type_name",
    },
    ColumnRule {
        phrases: &["by day", "daily"],
        table: TIME_DIMENSION,
        column: "dtm.trade_date",
    },
    ColumnRule {
        phrases: &["by month", "monthly"],
        table: TIME_DIMENSION,
        column: "dtm.month",
    },
];

const MEASURE_RULES: &[ColumnRule] = &[
    ColumnRule {
        phrases: &["pnl", "profit"],
        table: FACT_TABLE,
        column: "f.pnl",
    },
    ColumnRule {
        phrases: &["volume", "quantity"],
        table: FACT_TABLE,
        column: "f.quantity",
    },
    ColumnRule {
        phrases: &["commission"],
        table: FACT_TABLE,
        column: "f.commission",
    },
    ColumnRule {
        phrases: &["price"],
        table: FACT_TABLE,
        column: "f.price",
    },
];

const DEFAULT_MEASURE: &str = "f.notional_value";

/// Sort direction of a ranked query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// How many rows come back, and whether they are ranked by the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RowLimit {
    Ranked { direction: SortDirection, limit: usize },
    Capped { limit: usize },
}

/// Clause-level decisions for one query, before join resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlPlan {
    pub aggregate: AggregateFn,
    /// Qualified measure column, e.g. `f.pnl`.
    pub measure: String,
    pub group_by: Vec<String>,
    pub filters: Vec<String>,
    pub limit: RowLimit,
    /// Tables to join, in schema order, fact table included.
    pub tables: Vec<String>,
}

impl SqlPlan {
    /// Output alias of the aggregated measure, e.g. `sum_pnl`.
    #[must_use]
    pub fn metric_alias(&self) -> String {
        let column = self
            .measure
            .rsplit('.')
            .next()
            .unwrap_or(self.measure.as_str());
        format!("{}_{column}", self.aggregate.sql_name().to_lowercase())
    }
}

/// Assembled SQL text plus the join path it was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssembledSql {
    pub sql: String,
    pub join_path: Vec<String>,
    pub plan: SqlPlan,
}

/// Builds SQL text for queries over a star schema.
pub struct SqlAssembler<'a> {
    schema: &'a StarSchema,
    weights: &'a KeywordWeights,
}

impl<'a> SqlAssembler<'a> {
    #[must_use]
    pub fn new(schema: &'a StarSchema, weights: &'a KeywordWeights) -> Self {
        Self { schema, weights }
    }

    /// Apply the phrase rules to `query`.
    ///
    /// `relevance` contributes every table scoring at least
    /// [`MIN_JOIN_SCORE`]; rule-required tables are always included.
    #[must_use]
    pub fn plan(&self, query: &str, ctx: &QueryContext, relevance: &[TableRelevance]) -> SqlPlan {
        let lower = query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        let tokens: Vec<&str> = lower
            .split(' ')
            .map(|t| t.trim_matches(|c: char| c.is_ascii_punctuation()))
            .filter(|t| !t.is_empty())
            .collect();

        let mut required: Vec<&str> = vec![FACT_TABLE];

        let mut group_by: Vec<String> = Vec::new();
        for rule in GROUP_RULES {
            if rule.phrases.iter().any(|p| lower.contains(p))
                && !group_by.iter().any(|c| c == rule.column)
            {
                group_by.push(rule.column.to_string());
                required.push(rule.table);
            }
        }

        let measure = MEASURE_RULES
            .iter()
            .find(|rule| rule.phrases.iter().any(|p| tokens.contains(p)))
            .map_or(DEFAULT_MEASURE, |rule| rule.column)
            .to_string();

        let mut filters = Vec::new();
        match ctx.time_hint {
            Some(TimeHint::Current) => {
                filters.push("dtm.trade_date = DATE('now')".to_string());
                required.push(TIME_DIMENSION);
            }
            Some(TimeHint::Past) => {
                filters.push("dtm.trade_date = DATE('now', '-1 day')".to_string());
                required.push(TIME_DIMENSION);
            }
            None => {}
        }

        let buy = tokens.contains(&"buy");
        let sell = tokens.contains(&"sell");
        if buy != sell {
            let side = if buy { "BUY" } else { "SELL" };
            filters.push(format!("dot.side = '{side}'"));
            required.push(ORDER_TYPE);
        }

        let tickers = self.tickers(ctx);
        if !tickers.is_empty() {
            let quoted: Vec<String> = tickers.iter().map(|t| format!("'{t}'")).collect();
            filters.push(format!("ds.symbol IN ({})", quoted.join(", ")));
            required.push(SECURITY);
        }

        let tables = self
            .schema
            .tables()
            .iter()
            .map(|t| t.name.as_str())
            .filter(|name| {
                required.contains(name)
                    || relevance
                        .iter()
                        .any(|r| r.table == *name && r.relevance_score >= MIN_JOIN_SCORE)
            })
            .map(str::to_string)
            .collect();

        let aggregate = ctx
            .aggregation_hints
            .iter()
            .next()
            .copied()
            .unwrap_or(AggregateFn::Sum);

        let plan = SqlPlan {
            aggregate,
            measure,
            group_by,
            filters,
            limit: row_limit(&tokens),
            tables,
        };
        tracing::debug!(?plan, "planned sql");
        plan
    }

    /// Render `plan` joined along `join_path`.
    ///
    /// The first path entry is the FROM table; every other entry joins on
    /// its fact foreign key. Entries with no foreign key are skipped.
    #[must_use]
    pub fn render(&self, plan: &SqlPlan, join_path: &[String]) -> String {
        let fact = self.schema.fact_table_name();
        let metric = plan.metric_alias();
        let aggregate = match plan.aggregate {
            AggregateFn::Count => "COUNT(*)".to_string(),
            other => format!("{}({})", other.sql_name(), plan.measure),
        };

        let mut select = plan.group_by.clone();
        select.push(format!("{aggregate} AS {metric}"));

        let mut lines = vec![
            format!("SELECT {}", select.join(", ")),
            format!("FROM {fact} {}", table_alias(fact)),
        ];

        for table in join_path.iter().filter(|t| t.as_str() != fact) {
            let Some(fk) = self.schema.join_column(table) else {
                tracing::debug!(table = table.as_str(), "no foreign key; not joined");
                continue;
            };
            let pk = self
                .schema
                .table(table)
                .and_then(|t| t.primary_key())
                .map_or(fk, |c| c.name.as_str());
            let alias = table_alias(table);
            lines.push(format!(
                "JOIN {table} {alias} ON {}.{fk} = {alias}.{pk}",
                table_alias(fact)
            ));
        }

        if !plan.filters.is_empty() {
            lines.push(format!("WHERE {}", plan.filters.join(" AND ")));
        }
        if !plan.group_by.is_empty() {
            lines.push(format!("GROUP BY {}", plan.group_by.join(", ")));
        }
        match plan.limit {
            RowLimit::Ranked { direction, limit } => {
                lines.push(format!("ORDER BY {metric} {}", direction.as_sql()));
                lines.push(format!("LIMIT {limit}"));
            }
            RowLimit::Capped { limit } => lines.push(format!("LIMIT {limit}")),
        }

        lines.join("\n")
    }

    /// Ticker-like entities: 2-5 uppercase letters or digits, not keywords.
    fn tickers(&self, ctx: &QueryContext) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entity in &ctx.capitalized_entities {
            let ticker_like = (2..=5).contains(&entity.len())
                && entity
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
            if ticker_like && !self.weights.contains(&entity.to_lowercase()) && !out.contains(entity)
            {
                out.push(entity.clone());
            }
        }
        out
    }
}

/// SQL alias for a schema table.
#[must_use]
pub fn table_alias(table: &str) -> &str {
    match table {
        FACT_TABLE => "f",
        SECURITY => "ds",
        TRADER => "dt",
        TIME_DIMENSION => "dtm",
        COUNTERPARTY => "dc",
        ORDER_TYPE => "dot",
        other => other,
    }
}

fn row_limit(tokens: &[&str]) -> RowLimit {
    for (i, token) in tokens.iter().enumerate() {
        let direction = match *token {
            "top" => SortDirection::Desc,
            "bottom" | "worst" => SortDirection::Asc,
            _ => continue,
        };
        let limit = tokens
            .get(i + 1)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_RANK);
        return RowLimit::Ranked { direction, limit };
    }
    RowLimit::Capped {
        limit: DEFAULT_LIMIT,
    }
}
