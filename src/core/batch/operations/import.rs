//! Import planning: deduplication and conflict routing

use crate::core::batch::types::{
    BatchResult, ExecutionStrategy, IndexedRecord, RecordFailure, SkipReason, SkippedRecord,
    UniqueKey,
};
use crate::utils::error::{RecordError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Options for [`BatchOperations::batch_import`](super::BatchOperations::batch_import)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Fields whose combined values identify a record
    pub unique_fields: Vec<String>,
    /// Turn inserts that hit an existing key into updates instead of skipping them
    pub update_on_conflict: bool,
    pub return_stats: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            unique_fields: Vec::new(),
            update_on_conflict: false,
            return_stats: true,
        }
    }
}

impl ImportOptions {
    pub fn new<I, S>(unique_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique_fields: unique_fields.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn update_on_conflict(mut self, update: bool) -> Self {
        self.update_on_conflict = update;
        self
    }

    pub fn return_stats(mut self, return_stats: bool) -> Self {
        self.return_stats = return_stats;
        self
    }
}

/// Counters reported by an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of an import; `stats` is present when requested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome<E> {
    pub result: BatchResult<E, E>,
    pub stats: Option<ImportStats>,
}

impl<E> ImportOutcome<E> {
    pub(crate) fn empty(strategy: ExecutionStrategy, return_stats: bool) -> Self {
        Self {
            result: BatchResult::empty(strategy),
            stats: return_stats.then(ImportStats::default),
        }
    }
}

/// Unique key per record, `None` where a record lacks one of the fields
pub(crate) fn unique_keys<E: Serialize>(
    records: &[E],
    unique_fields: &[String],
) -> Result<Vec<Option<UniqueKey>>> {
    records
        .iter()
        .map(|record| UniqueKey::from_record(record, unique_fields))
        .collect()
}

/// Distinct keys in first-seen order
pub(crate) fn distinct_keys(keys: &[Option<UniqueKey>]) -> Vec<UniqueKey> {
    let mut seen = HashSet::new();
    keys.iter()
        .flatten()
        .filter(|key| seen.insert(*key))
        .cloned()
        .collect()
}

/// Which keys are already stored
///
/// Keys whose lookup chunk failed or never started are `unresolved`; their
/// records cannot be routed safely and fail with the stored error.
#[derive(Debug, Default)]
pub(crate) struct KeyLookup {
    pub existing: HashSet<UniqueKey>,
    pub unresolved: HashMap<UniqueKey, RecordError>,
}

impl KeyLookup {
    pub fn unresolve(&mut self, keys: &[UniqueKey], error: &RecordError) {
        self.unresolved
            .extend(keys.iter().map(|key| (key.clone(), error.clone())));
    }
}

enum Route {
    Insert,
    Update,
    Skip(SkipReason),
    Fail(RecordError),
}

/// Records routed to inserts, updates, skips or failures
#[derive(Debug)]
pub(crate) struct ImportPlan<E> {
    pub inserts: Vec<IndexedRecord<E>>,
    pub updates: Vec<IndexedRecord<E>>,
    pub skipped: Vec<SkippedRecord<E>>,
    pub failed: Vec<RecordFailure<E>>,
}

impl<E> ImportPlan<E> {
    /// Route each record by its key
    ///
    /// The first occurrence of a key wins; later ones are skipped as
    /// duplicates. Records without a key are always inserted.
    pub fn build(
        records: Vec<E>,
        keys: Vec<Option<UniqueKey>>,
        lookup: &KeyLookup,
        update_on_conflict: bool,
    ) -> Self {
        let mut plan = Self {
            inserts: Vec::new(),
            updates: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };
        let mut seen: HashSet<UniqueKey> = HashSet::new();

        for (index, (record, key)) in records.into_iter().zip(keys).enumerate() {
            let Some(key) = key else {
                plan.inserts.push(IndexedRecord { index, record });
                continue;
            };

            let route = if seen.contains(&key) {
                Route::Skip(SkipReason::Duplicate)
            } else if let Some(error) = lookup.unresolved.get(&key) {
                Route::Fail(error.clone())
            } else if lookup.existing.contains(&key) {
                if update_on_conflict {
                    Route::Update
                } else {
                    Route::Skip(SkipReason::Conflict)
                }
            } else {
                Route::Insert
            };
            seen.insert(key);

            match route {
                Route::Update => plan.updates.push(IndexedRecord { index, record }),
                Route::Insert => plan.inserts.push(IndexedRecord { index, record }),
                Route::Skip(reason) => plan.skipped.push(SkippedRecord {
                    index,
                    record,
                    reason,
                }),
                Route::Fail(error) => plan.failed.push(RecordFailure {
                    index,
                    record,
                    error,
                }),
            }
        }

        plan
    }
}

/// Split indexed records into original positions and payloads
pub(crate) fn unzip_indexed<E>(items: Vec<IndexedRecord<E>>) -> (Vec<usize>, Vec<E>) {
    items
        .into_iter()
        .map(|item| (item.index, item.record))
        .unzip()
}
