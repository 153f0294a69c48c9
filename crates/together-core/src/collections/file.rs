use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Utc;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use uuid::Uuid;

use crate::model::Collection;

use super::{Collections, apply_upsert, row_has_id, sorted_newest_first, stamp_new_row};

/// Local fallback backend: one JSONL file per collection under the data
/// directory. Saves go through a temp file rename so a crash never leaves a
/// half-written collection behind.
#[derive(Debug)]
pub struct FileCollections {
    pub data_dir: PathBuf,
}

impl FileCollections {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        for collection in Collection::ALL {
            let path = collection_path(&data_dir, collection);
            if !path.exists() {
                fs::write(&path, "")?;
            }
        }

        info!(data_dir = %data_dir.display(), "opened collection files");
        Ok(Self { data_dir })
    }

    fn load(&self, collection: Collection) -> anyhow::Result<Vec<Value>> {
        load_jsonl(&collection_path(&self.data_dir, collection))
            .with_context(|| format!("failed to load {}", collection.table()))
    }

    fn save(&self, collection: Collection, rows: &[Value]) -> anyhow::Result<()> {
        save_jsonl_atomic(&collection_path(&self.data_dir, collection), rows)
            .with_context(|| format!("failed to save {}", collection.table()))
    }
}

impl Collections for FileCollections {
    #[tracing::instrument(skip(self))]
    fn select(&self, collection: Collection) -> anyhow::Result<Vec<Value>> {
        let rows = self.load(collection)?;
        if collection.newest_first() {
            Ok(sorted_newest_first(rows))
        } else {
            Ok(rows)
        }
    }

    #[tracing::instrument(skip(self, row))]
    fn insert(&self, collection: Collection, mut row: Value) -> anyhow::Result<Value> {
        let mut rows = self.load(collection)?;
        stamp_new_row(collection, &mut row, Utc::now());
        rows.push(row.clone());
        self.save(collection, &rows)?;
        Ok(row)
    }

    #[tracing::instrument(skip(self, row))]
    fn upsert(
        &self,
        collection: Collection,
        row: Value,
        conflict_key: &str,
    ) -> anyhow::Result<Value> {
        let mut rows = self.load(collection)?;
        let canonical = apply_upsert(&mut rows, collection, row, conflict_key, Utc::now());
        self.save(collection, &rows)?;
        Ok(canonical)
    }

    #[tracing::instrument(skip(self))]
    fn delete(&self, collection: Collection, id: Uuid) -> anyhow::Result<()> {
        let mut rows = self.load(collection)?;
        rows.retain(|row| !row_has_id(row, id));
        self.save(collection, &rows)?;
        Ok(())
    }
}

fn collection_path(data_dir: &Path, collection: Collection) -> PathBuf {
    data_dir.join(format!("{}.data", collection.table()))
}

fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Value>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let row: Value = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(row);
    }

    debug!(count = out.len(), "loaded rows from jsonl");
    Ok(out)
}

fn save_jsonl_atomic(path: &Path, rows: &[Value]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = rows.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for row in rows {
        let serialized = serde_json::to_string(row)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;
    use uuid::Uuid;

    use super::FileCollections;
    use crate::collections::Collections;
    use crate::model::Collection;

    #[test]
    fn insert_then_select_returns_newest_first() {
        let temp = tempdir().expect("tempdir");
        let store = FileCollections::open(temp.path()).expect("open");

        let first = store
            .insert(
                Collection::Notes,
                json!({"from_user": "Imran", "message": "first"}),
            )
            .expect("insert first");
        let second = store
            .insert(
                Collection::Notes,
                json!({"from_user": "Ajsa", "message": "second", "created_at": "2099-01-01T00:00:00Z"}),
            )
            .expect("insert second");

        assert!(first.get("id").is_some());
        assert!(first.get("created_at").is_some());

        let rows = store.select(Collection::Notes).expect("select");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("message"), second.get("message"));
    }

    #[test]
    fn upsert_replaces_in_place_by_key() {
        let temp = tempdir().expect("tempdir");
        let store = FileCollections::open(temp.path()).expect("open");

        let original = store
            .upsert(
                Collection::Moods,
                json!({"user_name": "Imran", "mood_emoji": "😊", "mood_text": ""}),
                "user_name",
            )
            .expect("first upsert");
        let replaced = store
            .upsert(
                Collection::Moods,
                json!({"user_name": "Imran", "mood_emoji": "😴", "mood_text": "long day"}),
                "user_name",
            )
            .expect("second upsert");

        assert_eq!(original.get("id"), replaced.get("id"));

        let rows = store.select(Collection::Moods).expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("mood_emoji").and_then(|v| v.as_str()),
            Some("😴")
        );
    }

    #[test]
    fn delete_removes_exactly_one_row() {
        let temp = tempdir().expect("tempdir");
        let store = FileCollections::open(temp.path()).expect("open");

        let keep = store
            .insert(Collection::Favorites, json!({"type": "food", "name": "Pizza", "person": "Imran", "emoji": "🍕"}))
            .expect("insert keep");
        let gone = store
            .insert(Collection::Favorites, json!({"type": "food", "name": "Tacos", "person": "Ajsa", "emoji": "🌮"}))
            .expect("insert gone");

        let gone_id: Uuid = gone
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|raw| raw.parse().ok())
            .expect("uuid id");
        store.delete(Collection::Favorites, gone_id).expect("delete");

        let rows = store.select(Collection::Favorites).expect("select");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), keep.get("id"));
    }
}
