//! Schema visualization: ER diagrams of the star schema.
//!
//! Supports DOT, Mermaid, and JSON output formats.

use serde::Serialize;

use tradelens_core::schema::{StarSchema, TableKind};

/// A table node with its columns.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramNode {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<DiagramColumn>,
}

/// A column as drawn in a node.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramColumn {
    pub name: String,
    pub data_type: String,
    /// `PK`, `FK`, or empty.
    pub key: &'static str,
}

/// A foreign-key edge from the fact table to a dimension.
#[derive(Debug, Clone, Serialize)]
pub struct DiagramEdge {
    pub source: String,
    pub target: String,
    pub column: String,
}

/// Nodes and edges of a schema, ready for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDiagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

impl SchemaDiagram {
    #[must_use]
    pub fn from_schema(schema: &StarSchema) -> Self {
        let nodes = schema
            .tables()
            .iter()
            .map(|t| DiagramNode {
                name: t.name.clone(),
                kind: t.kind,
                columns: t
                    .columns
                    .iter()
                    .map(|c| DiagramColumn {
                        name: c.name.clone(),
                        data_type: c.data_type.clone(),
                        key: if c.is_primary_key {
                            "PK"
                        } else if c.is_foreign_key {
                            "FK"
                        } else {
                            ""
                        },
                    })
                    .collect(),
            })
            .collect();

        let edges = schema
            .relationships()
            .iter()
            .map(|r| DiagramEdge {
                source: r.source.clone(),
                target: r.target.clone(),
                column: r.label.clone(),
            })
            .collect();

        Self { nodes, edges }
    }

    /// Format as DOT (Graphviz) with one record node per table.
    #[must_use]
    pub fn format_dot(&self) -> String {
        let mut out =
            String::from("digraph tradelens {\n  rankdir=LR;\n  node [shape=record];\n\n");

        for node in &self.nodes {
            let fields: Vec<String> = node
                .columns
                .iter()
                .map(|c| {
                    let key = if c.key.is_empty() {
                        String::new()
                    } else {
                        format!(" ({})", c.key)
                    };
                    format!("{}{key}\\l", c.name)
                })
                .collect();
            let style = match node.kind {
                TableKind::Fact => " style=bold",
                TableKind::Dimension => "",
            };
            out.push_str(&format!(
                "  \"{}\" [label=\"{{{}|{}}}\"{style}];\n",
                node.name,
                node.name,
                fields.join("")
            ));
        }

        out.push('\n');

        for edge in &self.edges {
            out.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\"];\n",
                edge.source, edge.target, edge.column
            ));
        }

        out.push_str("}\n");
        out
    }

    /// Format as a Mermaid `erDiagram`.
    #[must_use]
    pub fn format_mermaid(&self) -> String {
        let mut out = String::from("erDiagram\n");

        for node in &self.nodes {
            out.push_str(&format!("  {} {{\n", node.name));
            for column in &node.columns {
                let key = if column.key.is_empty() {
                    String::new()
                } else {
                    format!(" {}", column.key)
                };
                out.push_str(&format!(
                    "    {} {}{key}\n",
                    mermaid_type(&column.data_type),
                    column.name
                ));
            }
            out.push_str("  }\n");
        }

        for edge in &self.edges {
            out.push_str(&format!(
                "  {} ||--o{{ {} : {}\n",
                edge.target, edge.source, edge.column
            ));
        }

        out
    }

    /// Format as JSON.
    #[must_use]
    pub fn format_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Mermaid attribute types cannot carry precision: `DECIMAL(18,2)` → `DECIMAL`.
fn mermaid_type(data_type: &str) -> &str {
    data_type.split('(').next().unwrap_or(data_type).trim()
}
