//! Batch CRUD facade over a [`BatchStore`]
//!
//! Resolves the effective config per call, runs the configured strategy
//! through the store and maps the result to a domain-level outcome.

mod import;

pub use import::{ImportOptions, ImportOutcome, ImportStats};

use super::config::{BatchConfig, PipelineHooks};
use super::executor::BatchExecutor;
use super::operation::ChunkOutput;
use super::strategies::DEADLINE_REASON;
use super::types::{
    BatchResult, BatchSummary, ExecutionStrategy, OperationKind, RecordFailure, UniqueKey,
};
use crate::monitoring::metrics::{BatchToken, MetricsSnapshot};
use crate::storage::BatchStore;
use crate::utils::error::{BatchError, RecordError, Result, RetryPolicy};
use import::{ImportPlan, KeyLookup, distinct_keys, unique_keys, unzip_indexed};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of [`BatchOperations::batch_get`]
///
/// Ids with no stored record are listed in `missing` rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult<I, E> {
    /// Found records, in the order of the requested ids
    pub records: Vec<E>,
    pub missing: Vec<I>,
    pub failed: Vec<RecordFailure<I>>,
    pub summary: BatchSummary,
}

/// Batch operations over a store
pub struct BatchOperations<S: BatchStore> {
    store: Arc<S>,
    executor: BatchExecutor,
    hooks: PipelineHooks<S::Record, S::Record>,
}

impl<S: BatchStore> Clone for BatchOperations<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            executor: self.executor.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<S: BatchStore> BatchOperations<S> {
    /// Create a new batch operations instance
    pub fn new(store: Arc<S>, config: BatchConfig) -> Self {
        Self::with_executor(store, BatchExecutor::new(config))
    }

    pub fn with_executor(store: Arc<S>, executor: BatchExecutor) -> Self {
        Self {
            store,
            executor,
            hooks: PipelineHooks::default(),
        }
    }

    /// Hooks applied to insert, update, upsert and import chunks under the pipelined strategy
    pub fn with_record_hooks(mut self, hooks: PipelineHooks<S::Record, S::Record>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    pub fn config(&self) -> &BatchConfig {
        self.executor.config()
    }

    pub fn get_metrics(&self) -> MetricsSnapshot {
        self.executor.get_metrics()
    }

    /// Batch insert records
    pub async fn batch_insert(
        &self,
        records: Vec<S::Record>,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<S::Record, S::Record>> {
        let store = &*self.store;
        self.executor
            .execute_with_hooks(
                OperationKind::Insert,
                records,
                |chunk| store.insert(chunk),
                &self.hooks,
                config,
            )
            .await
    }

    /// Batch update records, writing only `fields` when given
    pub async fn batch_update(
        &self,
        records: Vec<S::Record>,
        fields: Option<&[String]>,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<S::Record, S::Record>> {
        let store = &*self.store;
        self.executor
            .execute_with_hooks(
                OperationKind::Update,
                records,
                move |chunk| store.update(chunk, fields),
                &self.hooks,
                config,
            )
            .await
    }

    /// Batch insert-or-replace records
    pub async fn batch_upsert(
        &self,
        records: Vec<S::Record>,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<S::Record, S::Record>> {
        let store = &*self.store;
        self.executor
            .execute_with_hooks(
                OperationKind::Upsert,
                records,
                |chunk| store.upsert(chunk),
                &self.hooks,
                config,
            )
            .await
    }

    /// Batch delete by id
    pub async fn batch_delete(
        &self,
        ids: Vec<S::Id>,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<S::Id, ()>> {
        let store = &*self.store;
        self.executor
            .execute(OperationKind::Delete, ids, |chunk| store.delete(chunk), config)
            .await
    }

    /// Alias of [`batch_delete`](Self::batch_delete)
    pub async fn batch_remove(
        &self,
        ids: Vec<S::Id>,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<S::Id, ()>> {
        self.batch_delete(ids, config).await
    }

    /// Batch fetch by id
    pub async fn batch_get(
        &self,
        ids: Vec<S::Id>,
        load_relations: Option<&[String]>,
        config: Option<&BatchConfig>,
    ) -> Result<FetchResult<S::Id, S::Record>> {
        let store = &*self.store;
        let requested = ids.clone();
        let result = self
            .executor
            .execute(
                OperationKind::Get,
                ids,
                move |chunk| store.get(chunk, load_relations),
                config,
            )
            .await?;

        let summary = result.summary();
        let mut records = Vec::with_capacity(result.successful.len());
        let mut missing = Vec::new();
        for success in result.successful {
            match success.value {
                Some(record) => records.push(record),
                None => missing.extend(requested.get(success.index).cloned()),
            }
        }
        if !missing.is_empty() {
            debug!(missing = missing.len(), "Omitting unmatched ids from fetch");
        }

        Ok(FetchResult {
            records,
            missing,
            failed: result.failed,
            summary,
        })
    }

    /// Apply `compute_fn` to every id
    ///
    /// `parallel` selects the parallel strategy; otherwise chunked is forced
    /// regardless of the configured strategy. A per-id error fails that id
    /// only; a fatal error aborts the call.
    pub async fn batch_compute<V, C, CFut>(
        &self,
        ids: Vec<S::Id>,
        compute_fn: C,
        parallel: bool,
        config: Option<&BatchConfig>,
    ) -> Result<BatchResult<S::Id, V>>
    where
        C: Fn(S::Id) -> CFut,
        CFut: Future<Output = Result<V>>,
    {
        let strategy = if parallel {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Chunked
        };
        let config = self
            .executor
            .effective_config(config)?
            .clone()
            .with_strategy(strategy);

        let compute = &compute_fn;
        let operation = move |chunk: Vec<S::Id>| async move {
            let mut output = ChunkOutput::with_capacity(chunk.len());
            for id in chunk {
                match compute(id).await {
                    Ok(value) => output.push_ok(value),
                    Err(error) if error.is_fatal() => return Err(error),
                    Err(error) => output.push_err(RecordError::from(error)),
                }
            }
            Ok(output)
        };

        self.executor
            .execute(OperationKind::Compute, ids, operation, Some(&config))
            .await
    }

    /// Import records, deduplicating on `options.unique_fields`
    ///
    /// Repeated keys within the input keep their first occurrence. Keys already
    /// stored are updated when `update_on_conflict` is set, otherwise skipped.
    pub async fn batch_import(
        &self,
        records: Vec<S::Record>,
        options: &ImportOptions,
        config: Option<&BatchConfig>,
    ) -> Result<ImportOutcome<S::Record>> {
        let config = self.executor.effective_config(config)?;
        if records.is_empty() {
            return Ok(ImportOutcome::empty(
                config.execution_strategy,
                options.return_stats,
            ));
        }

        let started = Instant::now();
        let deadline = config.deadline_from_now();
        let total = records.len();
        let keys = unique_keys(&records, &options.unique_fields)?;
        let lookup = self
            .existing_keys(&options.unique_fields, distinct_keys(&keys), config, deadline)
            .await?;
        let plan = ImportPlan::build(records, keys, &lookup, options.update_on_conflict);

        info!(
            records = total,
            inserts = plan.inserts.len(),
            updates = plan.updates.len(),
            skipped = plan.skipped.len(),
            failed = plan.failed.len(),
            "Planned batch import"
        );

        let token = self.executor.begin(OperationKind::Import, config);
        let outcome = self
            .run_import(
                plan,
                total,
                &options.unique_fields,
                config,
                token.as_ref(),
                deadline,
            )
            .await;
        self.executor.finish(token);

        let (mut result, inserted, updated) = outcome?;
        result.elapsed = started.elapsed();

        let stats = options.return_stats.then(|| ImportStats {
            inserted,
            updated,
            skipped: result.skipped_count(),
            failed: result.failure_count(),
        });
        if let Some(stats) = &stats {
            info!(
                inserted = stats.inserted,
                updated = stats.updated,
                skipped = stats.skipped,
                failed = stats.failed,
                "Batch import completed"
            );
        }

        Ok(ImportOutcome { result, stats })
    }

    /// Look up which keys are already stored, chunked and retried like any batch
    ///
    /// Only a fatal error is raised. Keys of a lookup chunk that exhausts its
    /// retries, or that would start past the deadline, are left unresolved.
    async fn existing_keys(
        &self,
        unique_fields: &[String],
        keys: Vec<UniqueKey>,
        config: &BatchConfig,
        deadline: Option<Instant>,
    ) -> Result<KeyLookup> {
        let mut lookup = KeyLookup::default();
        if keys.is_empty() {
            return Ok(lookup);
        }

        let size = self.executor.advisor().resolve(&keys, config);
        let policy = RetryPolicy::new(config.retry_config());
        for chunk in keys.chunks(size) {
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                lookup.unresolve(chunk, &RecordError::abandoned(DEADLINE_REASON));
                continue;
            }

            let outcome = policy
                .call_observed(
                    |_| self.store.existing_keys(unique_fields, chunk.to_vec()),
                    BatchError::is_retryable,
                    |_, _| {},
                )
                .await;
            match outcome.result {
                Ok(found) => lookup.existing.extend(found),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    warn!(
                        keys = chunk.len(),
                        attempts = outcome.attempts,
                        error = %error,
                        "Key lookup failed; records with these keys will fail"
                    );
                    let message = format!(
                        "key lookup failed: {} (after {} attempts)",
                        error, outcome.attempts
                    );
                    lookup.unresolve(chunk, &RecordError::chunk_failed(message));
                }
            }
        }
        Ok(lookup)
    }

    /// Run the planned inserts and updates under one metrics token
    async fn run_import(
        &self,
        plan: ImportPlan<S::Record>,
        total: usize,
        unique_fields: &[String],
        config: &BatchConfig,
        token: Option<&BatchToken>,
        deadline: Option<Instant>,
    ) -> Result<(BatchResult<S::Record, S::Record>, usize, usize)> {
        let ImportPlan {
            inserts,
            updates,
            skipped,
            failed,
        } = plan;
        let store = &*self.store;

        let (insert_positions, insert_records) = unzip_indexed(inserts);
        let insert_op = |chunk: Vec<S::Record>| store.insert(chunk);
        let inserted = self
            .executor
            .run(
                OperationKind::Import,
                insert_records,
                &insert_op,
                &self.hooks,
                config,
                token,
                deadline,
            )
            .await?;

        let (update_positions, update_records) = unzip_indexed(updates);
        let update_op = |chunk: Vec<S::Record>| store.update_matching(chunk, unique_fields);
        let updated = self
            .executor
            .run(
                OperationKind::Import,
                update_records,
                &update_op,
                &self.hooks,
                config,
                token,
                deadline,
            )
            .await?;

        if let Some(token) = token {
            self.executor.metrics().record_skipped(token, skipped.len());
            self.executor.metrics().record_failed(token, failed.len());
        }

        let inserted_count = inserted.success_count();
        let updated_count = updated.success_count();

        let mut result = BatchResult::empty(config.execution_strategy);
        result.total = total;
        result.absorb_mapped(inserted, &insert_positions);
        result.absorb_mapped(updated, &update_positions);
        result.skipped.extend(skipped);
        result.failed.extend(failed);
        result.sort_by_index();

        Ok((result, inserted_count, updated_count))
    }
}
