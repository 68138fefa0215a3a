//! Result formatting: JSON, Table, and Markdown output.

use serde::Serialize;

use tradelens_core::relevance::TableRelevance;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Table,
    Markdown,
}

/// Rows of display cells under named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    /// Relevance results as `table | score | reasons`.
    #[must_use]
    pub fn from_relevance(results: &[TableRelevance]) -> Self {
        Self {
            columns: vec!["table".into(), "score".into(), "reasons".into()],
            rows: results
                .iter()
                .map(|r| {
                    vec![
                        r.table.clone(),
                        format!("{:.2}", r.relevance_score),
                        r.reasons.join("; "),
                    ]
                })
                .collect(),
        }
    }

    /// Any serializable records, one column per field of the first record.
    ///
    /// Records that do not serialize to JSON objects produce an empty set.
    #[must_use]
    pub fn from_records<T: Serialize>(items: &[T]) -> Self {
        let objects: Vec<serde_json::Map<String, serde_json::Value>> = items
            .iter()
            .filter_map(|item| match serde_json::to_value(item) {
                Ok(serde_json::Value::Object(map)) => Some(map),
                _ => None,
            })
            .collect();

        let Some(first) = objects.first() else {
            return Self::default();
        };
        let columns: Vec<String> = first.keys().cloned().collect();
        let rows = objects
            .iter()
            .map(|obj| {
                columns
                    .iter()
                    .map(|c| obj.get(c).map_or_else(|| "null".to_string(), value_to_display))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}

/// Format relevance results; JSON keeps the full structure.
#[must_use]
pub fn format_relevance(results: &[TableRelevance], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(results),
        other => format_results(&ResultSet::from_relevance(results), other),
    }
}

/// Format serializable records; JSON keeps the full structure.
#[must_use]
pub fn format_records<T: Serialize>(items: &[T], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(items),
        other => format_results(&ResultSet::from_records(items), other),
    }
}

/// Format a result set in the specified output format.
#[must_use]
pub fn format_results(result: &ResultSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(result),
        OutputFormat::Table => format_table(result),
        OutputFormat::Markdown => format_markdown(result),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

fn format_json(result: &ResultSet) -> String {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned().map(serde_json::Value::String))
                .collect()
        })
        .collect();
    to_json(&rows)
}

fn format_table(result: &ResultSet) -> String {
    if result.rows.is_empty() {
        return "(no results)".to_string();
    }

    let mut widths: Vec<usize> = result.columns.iter().map(String::len).collect();
    for row in &result.rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut output = String::new();

    let header: Vec<String> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:width$}", c, width = widths[i]))
        .collect();
    output.push_str(header.join(" | ").trim_end());
    output.push('\n');

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&sep.join("-+-"));
    output.push('\n');

    for row in &result.rows {
        let vals: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                let cell = row.get(i).map_or("", String::as_str);
                format!("{cell:w$}")
            })
            .collect();
        output.push_str(vals.join(" | ").trim_end());
        output.push('\n');
    }

    output
}

fn format_markdown(result: &ResultSet) -> String {
    if result.rows.is_empty() {
        return "*No results*\n".to_string();
    }

    let mut output = String::new();

    output.push_str("| ");
    output.push_str(&result.columns.join(" | "));
    output.push_str(" |\n");

    output.push_str("| ");
    let seps: Vec<&str> = result.columns.iter().map(|_| "---").collect();
    output.push_str(&seps.join(" | "));
    output.push_str(" |\n");

    for row in &result.rows {
        output.push_str("| ");
        let vals: Vec<String> = row.iter().map(|cell| cell.replace('|', "\\|")).collect();
        output.push_str(&vals.join(" | "));
        output.push_str(" |\n");
    }

    output
}

fn value_to_display(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_display)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_relevance() -> Vec<TableRelevance> {
        let mut trader = TableRelevance::empty("dim_trader");
        trader.boost(0.5, "matched keyword 'traders' (weight 1.00)");
        trader.boost(0.2, "related to fact_trading_orders via trader_id");

        let mut fact = TableRelevance::empty("fact_trading_orders");
        fact.boost(0.5, "matched keyword 'pnl' (weight 1.00)");

        vec![trader, fact]
    }

    #[derive(Serialize)]
    struct Stat {
        name: &'static str,
        query_count: u64,
        last_queried: Option<&'static str>,
    }

    #[test]
    fn relevance_as_json_keeps_structure() {
        let output = format_relevance(&sample_relevance(), OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["table"], "dim_trader");
        assert!(parsed[0]["relevanceScore"].as_f64().unwrap() > 0.69);
        assert_eq!(parsed[0]["reasons"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn relevance_as_table() {
        let output = format_relevance(&sample_relevance(), OutputFormat::Table);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("table"));
        assert!(lines[0].contains("score"));
        assert!(lines[1].contains("-+-"));
        assert!(lines[2].starts_with("dim_trader"));
        assert!(lines[2].contains("0.70"));
        assert!(lines[2].contains("; related to"));
    }

    #[test]
    fn relevance_as_markdown() {
        let output = format_relevance(&sample_relevance(), OutputFormat::Markdown);
        assert!(output.starts_with("| table | score | reasons |\n| --- | --- | --- |\n"));
        assert!(output.contains("| fact_trading_orders | 0.50 |"));
    }

    #[test]
    fn records_use_first_record_fields() {
        let stats = [
            Stat {
                name: "dim_trader",
                query_count: 3,
                last_queried: Some("2026-01-01T00:00:00+00:00"),
            },
            Stat {
                name: "dim_time",
                query_count: 0,
                last_queried: None,
            },
        ];
        let set = ResultSet::from_records(&stats);
        assert_eq!(set.columns.len(), 3);
        assert_eq!(set.rows.len(), 2);
        assert!(set.rows[1].contains(&"null".to_string()));

        let table = format_records(&stats, OutputFormat::Table);
        assert!(table.contains("query_count"));
        assert!(table.contains("dim_trader"));
    }

    #[test]
    fn result_set_json_is_array_of_objects() {
        let set = ResultSet::from_relevance(&sample_relevance());
        let parsed: serde_json::Value =
            serde_json::from_str(&format_results(&set, OutputFormat::Json)).unwrap();
        assert_eq!(parsed[1]["table"], "fact_trading_orders");
        assert_eq!(parsed[1]["score"], "0.50");
    }

    #[test]
    fn format_empty_result() {
        let empty: Vec<TableRelevance> = Vec::new();
        assert_eq!(format_relevance(&empty, OutputFormat::Table), "(no results)");
        assert_eq!(
            format_relevance(&empty, OutputFormat::Markdown),
            "*No results*\n"
        );
        assert_eq!(format_relevance(&empty, OutputFormat::Json), "[]");
    }
}
