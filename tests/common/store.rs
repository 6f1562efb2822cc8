//! Fault-injecting store used by integration tests

use super::fixtures::User;
use batchops::{BatchError, BatchStore, ChunkOutput, InMemoryStore, UniqueKey};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type FailureRule = Box<dyn Fn(&[u64]) -> Option<BatchError> + Send + Sync>;
type LookupRule = Box<dyn Fn() -> BatchError + Send + Sync>;

/// Wraps an [`InMemoryStore`] and records every chunk it receives
///
/// A failure rule sees the ids in each chunk and may fail the whole call.
/// Key lookups are counted separately and fail only under a lookup rule.
pub struct FaultyUserStore {
    inner: InMemoryStore<User>,
    calls: AtomicUsize,
    chunk_sizes: Mutex<Vec<usize>>,
    active: AtomicUsize,
    peak: AtomicUsize,
    latency: Duration,
    rule: Mutex<Option<FailureRule>>,
    lookups: AtomicUsize,
    lookup_rule: Mutex<Option<LookupRule>>,
}

impl FaultyUserStore {
    pub fn new() -> Self {
        Self::with_users(Vec::new())
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            inner: InMemoryStore::with_records(users),
            calls: AtomicUsize::new(0),
            chunk_sizes: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            latency: Duration::ZERO,
            rule: Mutex::new(None),
            lookups: AtomicUsize::new(0),
            lookup_rule: Mutex::new(None),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn fail_when<F>(self, rule: F) -> Self
    where
        F: Fn(&[u64]) -> Option<BatchError> + Send + Sync + 'static,
    {
        *self.rule.lock() = Some(Box::new(rule));
        self
    }

    /// Fail every `existing_keys` call with the error `rule` builds
    pub fn fail_lookups_with<F>(self, rule: F) -> Self
    where
        F: Fn() -> BatchError + Send + Sync + 'static,
    {
        *self.lookup_rule.lock() = Some(Box::new(rule));
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &InMemoryStore<User> {
        &self.inner
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunk_sizes.lock().clone()
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn enter(&self, ids: &[u64]) -> Result<(), BatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.chunk_sizes.lock().push(ids.len());

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        let failure = self.rule.lock().as_ref().and_then(|rule| rule(ids));
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn ids_of(users: &[User]) -> Vec<u64> {
    users.iter().map(|u| u.id).collect()
}

#[async_trait::async_trait]
impl BatchStore for FaultyUserStore {
    type Record = User;
    type Id = u64;

    async fn insert(&self, records: Vec<User>) -> batchops::Result<ChunkOutput<User>> {
        self.enter(&ids_of(&records)).await?;
        self.inner.insert(records).await
    }

    async fn update(
        &self,
        records: Vec<User>,
        fields: Option<&[String]>,
    ) -> batchops::Result<ChunkOutput<User>> {
        self.enter(&ids_of(&records)).await?;
        self.inner.update(records, fields).await
    }

    async fn upsert(&self, records: Vec<User>) -> batchops::Result<ChunkOutput<User>> {
        self.enter(&ids_of(&records)).await?;
        self.inner.upsert(records).await
    }

    async fn delete(&self, ids: Vec<u64>) -> batchops::Result<ChunkOutput<()>> {
        self.enter(&ids).await?;
        self.inner.delete(ids).await
    }

    async fn get(
        &self,
        ids: Vec<u64>,
        load_relations: Option<&[String]>,
    ) -> batchops::Result<ChunkOutput<Option<User>>> {
        self.enter(&ids).await?;
        self.inner.get(ids, load_relations).await
    }

    async fn existing_keys(
        &self,
        unique_fields: &[String],
        keys: Vec<UniqueKey>,
    ) -> batchops::Result<HashSet<UniqueKey>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let failure = self.lookup_rule.lock().as_ref().map(|rule| rule());
        if let Some(error) = failure {
            return Err(error);
        }
        self.inner.existing_keys(unique_fields, keys).await
    }

    async fn update_matching(
        &self,
        records: Vec<User>,
        unique_fields: &[String],
    ) -> batchops::Result<ChunkOutput<User>> {
        self.enter(&ids_of(&records)).await?;
        self.inner.update_matching(records, unique_fields).await
    }
}
