//! Entity Store
//!
//! JSON file-based persistent storage for record collections. Each
//! collection is one pretty-printed JSON array on disk, read and
//! rewritten whole on every mutation. A per-store mutex serializes the
//! read-modify-write cycle so two in-flight mutations can never
//! interleave against the same blob.
//!
//! Reads never fail: a missing or unparseable blob degrades to an empty
//! collection with a warning. Mutations return `Result` so callers see
//! persistence failures instead of silently losing writes.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Store-level failure taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Update addressed a record that does not exist.
    #[error("no record with id {0}")]
    NotFound(String),

    /// Storage medium failure on write.
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Record failed to serialize.
    #[error("serialization failure: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A record type the store can persist.
///
/// The store owns `id` and the two timestamps; everything else passes
/// through verbatim. `Patch` is the record's shallow merge shape: every
/// populated field overwrites, last writer wins.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync {
    /// Collection name; doubles as the blob's file stem.
    const COLLECTION: &'static str;

    type Patch;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn set_created(&mut self, ts: DateTime<Utc>);
    fn set_updated(&mut self, ts: DateTime<Utc>);
    fn apply_patch(&mut self, patch: Self::Patch);
}

/// Durable collection of records keyed by store-assigned identifier.
pub struct EntityStore<T: Entity> {
    path: PathBuf,
    lock: Mutex<()>,
    _marker: PhantomData<T>,
}

impl<T: Entity> EntityStore<T> {
    /// Open (or create) the collection under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(format!("{}.json", T::COLLECTION)),
            lock: Mutex::new(()),
            _marker: PhantomData,
        })
    }

    /// Read the whole blob. Missing or corrupt blobs degrade to empty.
    async fn load_all(&self) -> Vec<T> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(collection = T::COLLECTION, "failed to read collection blob: {e}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(collection = T::COLLECTION, "failed to parse collection blob: {e}");
                Vec::new()
            }
        }
    }

    async fn save_all(&self, items: &[T]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(items)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }

    /// List records, optionally ordered by a field name (leading `-`
    /// for descending) and truncated to the first `limit`.
    pub async fn list(&self, order: Option<&str>, limit: Option<usize>) -> Vec<T> {
        let mut items = self.load_all().await;

        if let Some(spec) = order {
            let (field, descending) = match spec.strip_prefix('-') {
                Some(field) => (field, true),
                None => (spec, false),
            };
            let mut keyed: Vec<(Option<String>, T)> = items
                .into_iter()
                .map(|item| (sort_key(&item, field), item))
                .collect();
            keyed.sort_by(|a, b| compare_keys(&a.0, &b.0, descending));
            items = keyed.into_iter().map(|(_, item)| item).collect();
        }

        if let Some(limit) = limit {
            if limit > 0 {
                items.truncate(limit);
            }
        }

        items
    }

    /// List records matching every criterion exactly (AND semantics,
    /// no type coercion). Ordering and limit apply first, as in `list`.
    pub async fn filter(
        &self,
        criteria: &[(&str, Value)],
        order: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<T> {
        self.list(order, limit)
            .await
            .into_iter()
            .filter(|item| {
                let value = match serde_json::to_value(item) {
                    Ok(value) => value,
                    Err(_) => return false,
                };
                criteria
                    .iter()
                    .all(|(key, expected)| value.get(*key) == Some(expected))
            })
            .collect()
    }

    /// Fetch one record by id. Never fails.
    pub async fn get(&self, id: &str) -> Option<T> {
        self.load_all().await.into_iter().find(|item| item.id() == id)
    }

    /// Append a new record. The store assigns a fresh id and creation
    /// timestamp, overriding anything the caller set for those fields.
    pub async fn create(&self, mut record: T) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_all().await;
        record.set_id(Uuid::new_v4().to_string());
        record.set_created(Utc::now());
        items.push(record.clone());
        self.save_all(&items).await?;
        Ok(record)
    }

    /// Merge a patch over an existing record and stamp `updated_date`.
    /// Fails with `NotFound` on an unknown id; never creates.
    pub async fn update(&self, id: &str, patch: T::Patch) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_all().await;
        let record = items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.apply_patch(patch);
        record.set_updated(Utc::now());
        let updated = record.clone();
        self.save_all(&items).await?;
        Ok(updated)
    }

    /// Remove a record. Idempotent: deleting an absent id succeeds and
    /// leaves the collection unchanged.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut items = self.load_all().await;
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() != before {
            self.save_all(&items).await?;
        }
        Ok(())
    }

    /// Number of records in the collection.
    pub async fn count(&self) -> usize {
        self.load_all().await.len()
    }

    /// Path of the collection blob on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Stringified value of `field` for ordering, `None` when the field is
/// missing or JSON null.
fn sort_key<T: Serialize>(item: &T, field: &str) -> Option<String> {
    let value = serde_json::to_value(item).ok()?;
    match value.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Lexicographic comparison; absent keys sort last regardless of
/// direction.
fn compare_keys(a: &Option<String>, b: &Option<String>, descending: bool) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => {
            if descending {
                b.cmp(a)
            } else {
                a.cmp(b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Cultivation, CultivationPatch, Practice};
    use chrono::NaiveDate;
    use serde_json::json;
    use tempfile::tempdir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn practice_store(dir: &tempfile::TempDir) -> EntityStore<Practice> {
        EntityStore::open(dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_unique_stable_ids() {
        let dir = tempdir().unwrap();
        let store = practice_store(&dir);

        let a = store
            .create(Practice::practiced("c1", day(2024, 1, 1), None))
            .await
            .unwrap();
        let b = store
            .create(Practice::practiced("c1", day(2024, 1, 2), None))
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.created_date.is_some());
        let fetched = store.get(&a.id).await.unwrap();
        assert_eq!(fetched.id, a.id);
        assert_eq!(fetched.date, day(2024, 1, 1));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let store: EntityStore<Cultivation> = EntityStore::open(dir.path()).unwrap();

        let result = store
            .update("missing", CultivationPatch::default())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        // A failed update must never create the record.
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps() {
        let dir = tempdir().unwrap();
        let store: EntityStore<Cultivation> = EntityStore::open(dir.path()).unwrap();

        let created = store
            .create(Cultivation::new("Calligraphy", day(2024, 1, 1)))
            .await
            .unwrap();
        let updated = store
            .update(
                &created.id,
                CultivationPatch {
                    total_days_practiced: Some(7),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.total_days_practiced, 7);
        assert_eq!(updated.dao_name, "Calligraphy");
        assert!(updated.updated_date.is_some());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = practice_store(&dir);

        let record = store
            .create(Practice::rested("c1", day(2024, 1, 1)))
            .await
            .unwrap();
        store
            .create(Practice::rested("c1", day(2024, 1, 2)))
            .await
            .unwrap();

        store.delete(&record.id).await.unwrap();
        assert_eq!(store.count().await, 1);
        store.delete(&record.id).await.unwrap();
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_list_orders_descending_by_date() {
        let dir = tempdir().unwrap();
        let store = practice_store(&dir);

        for d in [day(2024, 1, 1), day(2024, 1, 3), day(2024, 1, 2)] {
            store.create(Practice::practiced("c1", d, None)).await.unwrap();
        }

        let dates: Vec<NaiveDate> = store
            .list(Some("-date"), None)
            .await
            .into_iter()
            .map(|p| p.date)
            .collect();
        assert_eq!(dates, vec![day(2024, 1, 3), day(2024, 1, 2), day(2024, 1, 1)]);
    }

    #[tokio::test]
    async fn test_missing_field_sorts_last_in_both_directions() {
        let dir = tempdir().unwrap();
        let store = practice_store(&dir);

        store
            .create(Practice::rested("c1", day(2024, 1, 1)))
            .await
            .unwrap(); // no duration_minutes
        store
            .create(Practice::practiced("c1", day(2024, 1, 2), Some(30)))
            .await
            .unwrap();

        let asc = store.list(Some("duration_minutes"), None).await;
        assert_eq!(asc.last().unwrap().date, day(2024, 1, 1));
        let desc = store.list(Some("-duration_minutes"), None).await;
        assert_eq!(desc.last().unwrap().date, day(2024, 1, 1));
    }

    #[tokio::test]
    async fn test_limit_truncates_after_ordering() {
        let dir = tempdir().unwrap();
        let store = practice_store(&dir);

        for d in 1..=5 {
            store
                .create(Practice::practiced("c1", day(2024, 1, d), None))
                .await
                .unwrap();
        }

        let top = store.list(Some("-date"), Some(2)).await;
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].date, day(2024, 1, 5));
    }

    #[tokio::test]
    async fn test_filter_exact_equality() {
        let dir = tempdir().unwrap();
        let store = practice_store(&dir);

        store.create(Practice::practiced("A", day(2024, 1, 1), None)).await.unwrap();
        store.create(Practice::practiced("B", day(2024, 1, 2), None)).await.unwrap();
        store.create(Practice::rested("A", day(2024, 1, 3))).await.unwrap();

        let mine = store
            .filter(&[("cultivation_id", json!("A"))], Some("date"), None)
            .await;
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.cultivation_id == "A"));
        assert_eq!(mine[0].date, day(2024, 1, 1));

        let mine_practiced = store
            .filter(
                &[("cultivation_id", json!("A")), ("practiced", json!(true))],
                None,
                None,
            )
            .await;
        assert_eq!(mine_practiced.len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_blob_degrades_to_empty() {
        let dir = tempdir().unwrap();
        let store = practice_store(&dir);
        std::fs::write(store.path(), "not json at all").unwrap();

        assert!(store.list(None, None).await.is_empty());
        assert!(store.get("anything").await.is_none());
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let store = practice_store(&dir);
            store
                .create(Practice::practiced("c1", day(2024, 1, 1), Some(45)))
                .await
                .unwrap()
                .id
        };

        let store = practice_store(&dir);
        let record = store.get(&id).await.unwrap();
        assert_eq!(record.duration_minutes, Some(45));
    }
}
