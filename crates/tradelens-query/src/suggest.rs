//! Query completions built from the best-matching table.

use tradelens_core::relevance::TableRelevance;
use tradelens_core::schema::{FACT_TABLE, TIME_DIMENSION};

const FACT_TEMPLATES: &[&str] = &[
    "by trader",
    "by security",
    "total pnl by desk",
    "top 10 by notional value",
    "for today",
    "average commission by order type",
];

const SECURITY_TEMPLATES: &[&str] = &[
    "by sector",
    "by symbol",
    "with highest volume",
    "trading today",
    "by exchange",
];

const TRADER_TEMPLATES: &[&str] = &[
    "by desk",
    "top 10 by pnl",
    "with the most trades",
    "by region",
    "worst 5 by pnl",
];

const TIME_TEMPLATES: &[&str] = &[
    "daily",
    "by month",
    "today",
    "yesterday",
    "by quarter",
];

const COUNTERPARTY_TEMPLATES: &[&str] = &[
    "by counterparty",
    "by credit rating",
    "by country",
    "with total notional value",
    "top 5 by volume",
];

const ORDER_TYPE_TEMPLATES: &[&str] = &[
    "by order type",
    "buy orders only",
    "sell orders only",
    "by time in force",
    "total volume by side",
];

/// Canonical completion templates for a table; empty for unknown tables.
#[must_use]
pub fn suggestion_templates(table: &str) -> &'static [&'static str] {
    match table {
        FACT_TABLE => FACT_TEMPLATES,
        "dim_security" => SECURITY_TEMPLATES,
        "dim_trader" => TRADER_TEMPLATES,
        TIME_DIMENSION => TIME_TEMPLATES,
        "dim_counterparty" => COUNTERPARTY_TEMPLATES,
        "dim_order_type" => ORDER_TYPE_TEMPLATES,
        _ => &[],
    }
}

/// Combine `partial` with the templates of the top-ranked table.
///
/// Returns at most `max` strings of the form `"<partial> <template>"`. An
/// empty (or whitespace-only) partial, or no relevant table, yields nothing.
#[must_use]
pub fn query_suggestions(partial: &str, top: Option<&TableRelevance>, max: usize) -> Vec<String> {
    let partial = partial.trim();
    if partial.is_empty() {
        return Vec::new();
    }
    let Some(top) = top else {
        return Vec::new();
    };

    suggestion_templates(&top.table)
        .iter()
        .take(max)
        .map(|template| format!("{partial} {template}"))
        .collect()
}
