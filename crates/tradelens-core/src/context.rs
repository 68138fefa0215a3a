//! Query context extraction: turns a natural-language question into the
//! signals the relevance scorer consumes.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::keywords::KeywordWeights;

static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Z][A-Za-z0-9]+").unwrap());

/// Substrings that signal an aggregation, with the SQL aggregate they map to.
const AGGREGATION_KEYWORDS: &[(&str, AggregateFn)] = &[
    ("sum", AggregateFn::Sum),
    ("count", AggregateFn::Count),
    ("average", AggregateFn::Avg),
    ("avg", AggregateFn::Avg),
    ("max", AggregateFn::Max),
    ("min", AggregateFn::Min),
    ("total", AggregateFn::Sum),
];

const CURRENT_MARKERS: &[&str] = &["today", "current"];
const PAST_MARKERS: &[&str] = &["yesterday", "previous"];

/// Canonical SQL aggregate functions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFn {
    Sum,
    Count,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    #[must_use]
    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFn::Sum => "SUM",
            AggregateFn::Count => "COUNT",
            AggregateFn::Avg => "AVG",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
        }
    }
}

/// Temporal framing detected in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHint {
    Current,
    Past,
}

impl TimeHint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeHint::Current => "current",
            TimeHint::Past => "past",
        }
    }
}

/// Signals derived from one query string. Created per query, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryContext {
    /// Query tokens that appear in the keyword table.
    pub keywords: BTreeSet<String>,
    /// Capitalised words (proper nouns, tickers) in order of appearance.
    pub capitalized_entities: Vec<String>,
    pub aggregation_hints: BTreeSet<AggregateFn>,
    pub time_hint: Option<TimeHint>,
}

impl QueryContext {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.capitalized_entities.is_empty()
            && self.aggregation_hints.is_empty()
            && self.time_hint.is_none()
    }
}

/// Extract a [`QueryContext`] from a raw query.
///
/// Keywords are matched per whitespace-separated token after lowercasing and
/// trimming surrounding punctuation; aggregation and time markers are matched
/// as substrings of the lowercased query. An empty query yields an empty
/// context.
#[must_use]
pub fn extract_query_context(query: &str, weights: &KeywordWeights) -> QueryContext {
    let lower = query.to_lowercase();

    let keywords = lower
        .split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|token| weights.contains(token))
        .map(str::to_string)
        .collect();

    let capitalized_entities = ENTITY_PATTERN
        .find_iter(query)
        .map(|m| m.as_str().to_string())
        .collect();

    let aggregation_hints = AGGREGATION_KEYWORDS
        .iter()
        .filter(|(marker, _)| lower.contains(marker))
        .map(|(_, agg)| *agg)
        .collect();

    let time_hint = if CURRENT_MARKERS.iter().any(|m| lower.contains(m)) {
        Some(TimeHint::Current)
    } else if PAST_MARKERS.iter().any(|m| lower.contains(m)) {
        Some(TimeHint::Past)
    } else {
        None
    };

    let ctx = QueryContext {
        keywords,
        capitalized_entities,
        aggregation_hints,
        time_hint,
    };
    tracing::debug!(
        keywords = ?ctx.keywords,
        aggregations = ?ctx.aggregation_hints,
        time_hint = ?ctx.time_hint,
        "extracted query context"
    );
    ctx
}
