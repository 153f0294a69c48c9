use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::model::Collection;

pub mod file;
pub mod memory;
pub mod rest;

pub use file::FileCollections;
pub use memory::MemoryCollections;
pub use rest::RestCollections;

/// The remote collection store boundary: typed CRUD over named collections.
/// Failure is an error value, distinct from an empty-result success. Every
/// implementation returns the canonical record (server-assigned id and
/// timestamps included) from insert/upsert.
pub trait Collections: Send + Sync {
    fn select(&self, collection: Collection) -> anyhow::Result<Vec<Value>>;

    fn insert(&self, collection: Collection, row: Value) -> anyhow::Result<Value>;

    fn upsert(
        &self,
        collection: Collection,
        row: Value,
        conflict_key: &str,
    ) -> anyhow::Result<Value>;

    fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<()>;
}

/// Picks the backend: the configured remote service when `service.url` is
/// set, local collection files otherwise.
pub fn open(cfg: &Config, data_dir: &Path) -> anyhow::Result<Box<dyn Collections>> {
    let url = cfg.get("service.url").unwrap_or_default();
    if url.trim().is_empty() {
        info!("no service.url configured; using local collection files");
        return Ok(Box::new(FileCollections::open(data_dir)?));
    }

    let key = cfg.get("service.key").unwrap_or_default();
    let timeout_seconds = cfg
        .get("request.timeout.seconds")
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(10);
    let client = RestCollections::new(
        url.trim(),
        key.trim(),
        Duration::from_secs(timeout_seconds),
    )
    .context("failed to set up remote collection client")?;
    Ok(Box::new(client))
}

/// Fills the server-assigned fields on a fresh row, the way the remote
/// service would.
pub(crate) fn stamp_new_row(collection: Collection, row: &mut Value, now: DateTime<Utc>) {
    let Some(map) = row.as_object_mut() else {
        return;
    };

    if !map.contains_key("id") {
        map.insert("id".to_string(), json!(Uuid::new_v4()));
    }
    if collection.stamps_created_at() && !map.contains_key("created_at") {
        map.insert("created_at".to_string(), json!(now));
    }
    if collection.stamps_updated_at() {
        map.entry("updated_at".to_string()).or_insert_with(|| json!(now));
    }
}

/// Insert-or-update keyed on `conflict_key` (comma-separated for composite
/// keys). An existing row keeps its id and created_at; everything else is
/// replaced. Returns the canonical row.
pub(crate) fn apply_upsert(
    rows: &mut Vec<Value>,
    collection: Collection,
    mut row: Value,
    conflict_key: &str,
    now: DateTime<Utc>,
) -> Value {
    let keys: Vec<&str> = conflict_key.split(',').map(str::trim).collect();
    let same_key =
        |candidate: &Value| keys.iter().all(|key| candidate.get(*key) == row.get(*key));

    if let Some(idx) = rows.iter().position(same_key) {
        let existing = &mut rows[idx];
        if let (Some(dst), Some(src)) = (existing.as_object_mut(), row.as_object()) {
            for (key, value) in src {
                if key != "id" && key != "created_at" {
                    dst.insert(key.clone(), value.clone());
                }
            }
            if collection.stamps_updated_at() {
                dst.insert("updated_at".to_string(), json!(now));
            }
        }
        return existing.clone();
    }

    stamp_new_row(collection, &mut row, now);
    rows.push(row.clone());
    row
}

pub(crate) fn sorted_newest_first(mut rows: Vec<Value>) -> Vec<Value> {
    rows.sort_by_key(|row| {
        std::cmp::Reverse(
            row.get("created_at")
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        )
    });
    rows
}

pub(crate) fn row_has_id(row: &Value, id: Uuid) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id.to_string().as_str())
}
