//! The built-in trading catalog: star schema plus keyword table.

use std::sync::Arc;

use crate::error::Result;
use crate::keywords::KeywordWeights;
use crate::schema::StarSchema;

/// Validated schema and keyword table, shared by reference.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub schema: Arc<StarSchema>,
    pub weights: Arc<KeywordWeights>,
}

impl Catalog {
    /// Build the trading catalog, enforcing the star contract and checking
    /// every keyword weight against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`TradelensError::Schema`](crate::error::TradelensError::Schema)
    /// if either table is inconsistent.
    pub fn trading() -> Result<Self> {
        let schema = StarSchema::trading()?;
        let weights = KeywordWeights::trading();
        weights.validate(&schema)?;
        tracing::debug!(
            tables = schema.tables().len(),
            keywords = weights.len(),
            "loaded trading catalog"
        );
        Ok(Self {
            schema: Arc::new(schema),
            weights: Arc::new(weights),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SchemaError, TradelensError};
    use crate::schema::FACT_TABLE;

    #[test]
    fn trading_catalog_is_consistent() {
        let catalog = Catalog::trading().unwrap();
        assert_eq!(catalog.schema.fact_table_name(), FACT_TABLE);
        assert_eq!(catalog.schema.relationships().len(), 5);
        assert!(catalog.weights.contains("pnl"));
    }

    #[test]
    fn schema_errors_convert_to_top_level() {
        let err: TradelensError = SchemaError::MissingFactTable.into();
        assert!(matches!(
            err,
            TradelensError::Schema(SchemaError::MissingFactTable)
        ));
        assert_eq!(err.to_string(), "schema error: schema has no fact table");
    }
}
