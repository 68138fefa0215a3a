//! Join-path resolution over a star schema.
//!
//! The fact table is the mandatory hub: every dimension joins to it through
//! its foreign key, so a path is the fact table followed by the distinct
//! dimensions in the order they were asked for.

/// Order `tables` for joining, fact table first.
///
/// Empty input stays empty. Input made only of the fact table (possibly
/// repeated) collapses to a single entry. Otherwise the fact table is
/// prepended when absent and duplicates are dropped, keeping first-seen
/// order. Names the schema does not know are passed through.
#[must_use]
pub fn resolve_star_join_path<S: AsRef<str>>(fact_table: &str, tables: &[S]) -> Vec<String> {
    if tables.is_empty() {
        return Vec::new();
    }

    let mut path = vec![fact_table.to_string()];
    for table in tables {
        let table = table.as_ref();
        if !path.iter().any(|p| p == table) {
            path.push(table.to_string());
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tradelens_core::schema::FACT_TABLE;

    fn resolve(tables: &[&str]) -> Vec<String> {
        resolve_star_join_path(FACT_TABLE, tables)
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(resolve(&[]).is_empty());
    }

    #[test]
    fn fact_only_input_is_unchanged() {
        assert_eq!(resolve(&[FACT_TABLE]), vec![FACT_TABLE]);
        assert_eq!(resolve(&[FACT_TABLE, FACT_TABLE]), vec![FACT_TABLE]);
    }

    #[test]
    fn fact_table_is_prepended() {
        assert_eq!(
            resolve(&["dim_security", "dim_trader"]),
            vec![FACT_TABLE, "dim_security", "dim_trader"]
        );
    }

    #[test]
    fn fact_table_moves_to_front() {
        assert_eq!(
            resolve(&["dim_time", FACT_TABLE, "dim_counterparty"]),
            vec![FACT_TABLE, "dim_time", "dim_counterparty"]
        );
    }

    #[test]
    fn duplicates_keep_first_position() {
        assert_eq!(
            resolve(&["dim_trader", "dim_time", "dim_trader"]),
            vec![FACT_TABLE, "dim_trader", "dim_time"]
        );
    }

    #[test]
    fn unknown_tables_pass_through() {
        assert_eq!(resolve(&["dim_venue"]), vec![FACT_TABLE, "dim_venue"]);
    }

    fn table_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(FACT_TABLE.to_string()),
            Just("dim_security".to_string()),
            Just("dim_trader".to_string()),
            Just("dim_time".to_string()),
            Just("dim_counterparty".to_string()),
            Just("dim_order_type".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn fact_table_leads_any_non_empty_path(tables in prop::collection::vec(table_name(), 1..12)) {
            let path = resolve_star_join_path(FACT_TABLE, &tables);
            prop_assert_eq!(path[0].as_str(), FACT_TABLE);
        }

        #[test]
        fn paths_have_no_duplicates(tables in prop::collection::vec(table_name(), 0..12)) {
            let path = resolve_star_join_path(FACT_TABLE, &tables);
            let mut seen = std::collections::HashSet::new();
            for table in &path {
                prop_assert!(seen.insert(table.clone()), "duplicate {}", table);
            }
        }

        #[test]
        fn every_input_table_is_on_the_path(tables in prop::collection::vec(table_name(), 0..12)) {
            let path = resolve_star_join_path(FACT_TABLE, &tables);
            for table in &tables {
                prop_assert!(path.contains(table));
            }
        }
    }
}
