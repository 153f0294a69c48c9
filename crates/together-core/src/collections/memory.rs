use std::collections::HashMap;

use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::model::Collection;

use super::{Collections, apply_upsert, row_has_id, sorted_newest_first, stamp_new_row};

/// In-memory collection store for tests and ephemeral runs. Behaves like the
/// remote service: assigns ids and timestamps, keeps at most one row per
/// conflict key, and orders list collections newest-first on select.
#[derive(Debug, Default)]
pub struct MemoryCollections {
    rows: Mutex<HashMap<Collection, Vec<Value>>>,
}

impl MemoryCollections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates a collection, bypassing the insert path. Test setup
    /// helper; rows are stored as given.
    pub fn seed(&self, collection: Collection, rows: Vec<Value>) {
        self.rows.lock().insert(collection, rows);
    }
}

impl Collections for MemoryCollections {
    fn select(&self, collection: Collection) -> anyhow::Result<Vec<Value>> {
        let rows = self
            .rows
            .lock()
            .get(&collection)
            .cloned()
            .unwrap_or_default();
        debug!(collection = %collection, count = rows.len(), "memory select");
        if collection.newest_first() {
            Ok(sorted_newest_first(rows))
        } else {
            Ok(rows)
        }
    }

    fn insert(&self, collection: Collection, mut row: Value) -> anyhow::Result<Value> {
        stamp_new_row(collection, &mut row, Utc::now());
        self.rows
            .lock()
            .entry(collection)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    fn upsert(
        &self,
        collection: Collection,
        row: Value,
        conflict_key: &str,
    ) -> anyhow::Result<Value> {
        let mut guard = self.rows.lock();
        let rows = guard.entry(collection).or_default();
        Ok(apply_upsert(rows, collection, row, conflict_key, Utc::now()))
    }

    fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<()> {
        let mut guard = self.rows.lock();
        if let Some(rows) = guard.get_mut(&collection) {
            rows.retain(|row| !row_has_id(row, id));
        }
        Ok(())
    }
}
