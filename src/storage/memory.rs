//! In-memory [`BatchStore`] backend

use super::BatchStore;
use crate::core::batch::{ChunkOutput, UniqueKey};
use crate::utils::error::{BatchError, RecordError, Result};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Record type storable in [`InMemoryStore`]
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Serialize + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
}

/// Hash-map backed store, mainly for tests and prototyping
#[derive(Debug)]
pub struct InMemoryStore<E: Entity> {
    rows: RwLock<HashMap<E::Id, E>>,
    available: AtomicBool,
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl<E: Entity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records<I: IntoIterator<Item = E>>(records: I) -> Self {
        let store = Self::new();
        {
            let mut rows = store.rows.write();
            for record in records {
                rows.insert(record.id(), record);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    pub fn find(&self, id: &E::Id) -> Option<E> {
        self.rows.read().get(id).cloned()
    }

    pub fn contains(&self, id: &E::Id) -> bool {
        self.rows.read().contains_key(id)
    }

    /// Simulate the backend going away; every call then fails fatally
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BatchError::fatal("in-memory store is unavailable"))
        }
    }
}

/// Copy `fields` from `incoming` onto `existing`
fn merge_fields<E: Entity>(
    existing: &E,
    incoming: &E,
    fields: &[String],
) -> std::result::Result<E, RecordError> {
    let to_record_error = |e: serde_json::Error| RecordError::record(e.to_string());

    let mut target = serde_json::to_value(existing).map_err(to_record_error)?;
    let source = serde_json::to_value(incoming).map_err(to_record_error)?;

    let (Some(target_map), Some(source_map)) = (target.as_object_mut(), source.as_object()) else {
        return Err(RecordError::record("field updates require object records"));
    };
    for field in fields {
        match source_map.get(field) {
            Some(value) => {
                target_map.insert(field.clone(), value.clone());
            }
            None => return Err(RecordError::record(format!("unknown field: {}", field))),
        }
    }

    serde_json::from_value(target).map_err(to_record_error)
}

#[async_trait::async_trait]
impl<E: Entity> BatchStore for InMemoryStore<E> {
    type Record = E;
    type Id = E::Id;

    async fn insert(&self, records: Vec<E>) -> Result<ChunkOutput<E>> {
        self.ensure_available()?;
        let mut rows = self.rows.write();
        let output = records
            .into_iter()
            .map(|record| {
                let id = record.id();
                if rows.contains_key(&id) {
                    Err(RecordError::record(format!("duplicate id {:?}", id)))
                } else {
                    rows.insert(id, record.clone());
                    Ok(record)
                }
            })
            .collect();
        Ok(output)
    }

    async fn update(&self, records: Vec<E>, fields: Option<&[String]>) -> Result<ChunkOutput<E>> {
        self.ensure_available()?;
        let mut rows = self.rows.write();
        let output = records
            .into_iter()
            .map(|record| {
                let id = record.id();
                let Some(existing) = rows.get(&id) else {
                    return Err(RecordError::record(format!("no record with id {:?}", id)));
                };
                let updated = match fields {
                    Some(fields) => merge_fields(existing, &record, fields)?,
                    None => record,
                };
                rows.insert(id, updated.clone());
                Ok(updated)
            })
            .collect();
        Ok(output)
    }

    async fn upsert(&self, records: Vec<E>) -> Result<ChunkOutput<E>> {
        self.ensure_available()?;
        let mut rows = self.rows.write();
        for record in &records {
            rows.insert(record.id(), record.clone());
        }
        Ok(ChunkOutput::all_ok(records))
    }

    async fn delete(&self, ids: Vec<E::Id>) -> Result<ChunkOutput<()>> {
        self.ensure_available()?;
        let mut rows = self.rows.write();
        let output = ids
            .into_iter()
            .map(|id| match rows.remove(&id) {
                Some(_) => Ok(()),
                None => Err(RecordError::record(format!("no record with id {:?}", id))),
            })
            .collect();
        Ok(output)
    }

    async fn get(
        &self,
        ids: Vec<E::Id>,
        load_relations: Option<&[String]>,
    ) -> Result<ChunkOutput<Option<E>>> {
        self.ensure_available()?;
        if let Some(relations) = load_relations {
            debug!(?relations, "In-memory store has no relations to load");
        }
        let rows = self.rows.read();
        Ok(ChunkOutput::all_ok(ids.iter().map(|id| rows.get(id).cloned())))
    }

    async fn existing_keys(
        &self,
        unique_fields: &[String],
        keys: Vec<UniqueKey>,
    ) -> Result<HashSet<UniqueKey>> {
        self.ensure_available()?;
        let wanted: HashSet<UniqueKey> = keys.into_iter().collect();
        let rows = self.rows.read();

        let mut found = HashSet::new();
        for row in rows.values() {
            if let Some(key) = UniqueKey::from_record(row, unique_fields)? {
                if wanted.contains(&key) {
                    found.insert(key);
                }
            }
        }
        Ok(found)
    }

    async fn update_matching(
        &self,
        records: Vec<E>,
        unique_fields: &[String],
    ) -> Result<ChunkOutput<E>> {
        self.ensure_available()?;
        let mut rows = self.rows.write();

        let mut by_key: HashMap<UniqueKey, E::Id> = HashMap::with_capacity(rows.len());
        for (id, row) in rows.iter() {
            if let Some(key) = UniqueKey::from_record(row, unique_fields)? {
                by_key.insert(key, id.clone());
            }
        }

        let mut output = ChunkOutput::with_capacity(records.len());
        for record in records {
            let key = UniqueKey::from_record(&record, unique_fields)?;
            match key.and_then(|key| by_key.get(&key).cloned()) {
                Some(stored_id) => {
                    rows.remove(&stored_id);
                    rows.insert(record.id(), record.clone());
                    output.push_ok(record);
                }
                None => output.push_err(RecordError::record("no stored record matches unique key")),
            }
        }
        Ok(output)
    }
}
