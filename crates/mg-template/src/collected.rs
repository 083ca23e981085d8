//! Identifiers generated while applying one seed file

use serde::Serialize;
use std::collections::HashMap;

/// Generated ids per table, one slot per inserted row.
///
/// Rows inserted into a table without a generated key still take a slot
/// (`None`) so that `id(table, n)` always means the n-th inserted row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CollectedIds {
    tables: HashMap<String, Vec<Option<i64>>>,
}

impl CollectedIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one insert into `table`
    pub fn record(&mut self, table: &str, id: Option<i64>) {
        self.tables.entry(table.to_string()).or_default().push(id);
    }

    /// Slots recorded for a table, or `None` if nothing was inserted into it
    pub fn rows(&self, table: &str) -> Option<&[Option<i64>]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    /// The id generated for the `index`-th row inserted into `table`
    pub fn get(&self, table: &str, index: usize) -> Option<i64> {
        self.rows(table)
            .and_then(|rows| rows.get(index).copied())
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_slots_aligned() {
        let mut ids = CollectedIds::new();
        ids.record("tags", None);
        ids.record("tags", Some(7));

        assert_eq!(ids.rows("tags"), Some(&[None, Some(7)][..]));
        assert_eq!(ids.get("tags", 0), None);
        assert_eq!(ids.get("tags", 1), Some(7));
        assert_eq!(ids.get("tags", 2), None);
        assert!(ids.rows("widgets").is_none());
    }

    #[test]
    fn test_serializes_as_table_map() {
        let mut ids = CollectedIds::new();
        ids.record("widgets", Some(3));
        ids.record("widgets", None);

        let json = serde_json::to_value(&ids).unwrap();
        assert_eq!(json, serde_json::json!({ "widgets": [3, null] }));
    }
}
