//! # Feature store
//!
//! Results are written back through the [`FeatureStore`] trait: named tables of records
//! addressed by a string key, where writing an existing key replaces the row.
//!
//! [`MemoryStore`] keeps rows as `serde_json::Value`s and backs tests and small runs; file
//! exports live in [`export`].

pub mod export;

use std::collections::{BTreeMap, HashMap};

use ahash::RandomState;
use serde::Serialize;
use serde_json::Value;

use crate::geoloc_errors::GeolocError;

/// Keyed write-back of serializable records.
pub trait FeatureStore {
    /// Insert `record` under `key` in `table`, replacing any previous row with that key.
    fn upsert<R: Serialize + ?Sized>(
        &mut self,
        table: &str,
        key: &str,
        record: &R,
    ) -> Result<(), GeolocError>;
}

/// In-memory [`FeatureStore`]; rows of a table are kept in key order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: HashMap<String, BTreeMap<String, Value>, RandomState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str, key: &str) -> Option<&Value> {
        self.tables.get(table)?.get(key)
    }

    pub fn table(&self, table: &str) -> Option<&BTreeMap<String, Value>> {
        self.tables.get(table)
    }

    /// Number of rows in `table` (0 for an unknown table).
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty)
    }
}

impl FeatureStore for MemoryStore {
    fn upsert<R: Serialize + ?Sized>(
        &mut self,
        table: &str,
        key: &str,
        record: &R,
    ) -> Result<(), GeolocError> {
        let row = serde_json::to_value(record)?;
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(key.to_string(), row);
        Ok(())
    }
}

#[cfg(test)]
mod store_test {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        count: u32,
    }

    #[test]
    fn test_upsert_replaces_same_key() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store
            .upsert("t", "a", &Row { name: "x", count: 1 })
            .unwrap();
        store
            .upsert("t", "a", &Row { name: "x", count: 2 })
            .unwrap();
        store
            .upsert("t", "b", &Row { name: "y", count: 3 })
            .unwrap();

        assert_eq!(store.len("t"), 2);
        assert_eq!(store.len("missing"), 0);
        assert_eq!(store.get("t", "a"), Some(&json!({"name": "x", "count": 2})));
        let keys: Vec<_> = store.table("t").unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
