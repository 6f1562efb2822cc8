//! Concurrent chunk execution bounded by `max_workers`

use super::{ABORT_REASON, DEADLINE_REASON, ExecutionContext};
use crate::core::batch::chunk::{ChunkResolution, ResultAssembler, partition, run_chunk};
use crate::core::batch::operation::ChunkOutput;
use crate::core::batch::types::{BatchResult, ExecutionStrategy};
use crate::utils::error::{BatchError, Bulkhead, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

pub(super) async fn execute<T, R, F, Fut>(
    records: Vec<T>,
    operation: &F,
    ctx: &ExecutionContext<'_, T, R>,
) -> Result<BatchResult<T, R>>
where
    T: Clone + Serialize,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<ChunkOutput<R>>>,
{
    let size = ctx.advisor.resolve(&records, ctx.config);
    let workers = ctx.config.max_workers.max(1);
    let mut assembler = ResultAssembler::new(ExecutionStrategy::Parallel, records.len());
    let chunks = partition(records, size);
    let chunk_count = chunks.len();

    info!(
        chunks = chunk_count,
        chunk_size = size,
        max_workers = workers,
        "Executing parallel batch"
    );

    let bulkhead = Bulkhead::new("parallel-batch", workers);
    let aborted = AtomicBool::new(false);
    let policy = ctx.retry_policy();

    let bulkhead = &bulkhead;
    let aborted = &aborted;
    let policy = &policy;

    let mut results = stream::iter(chunks)
        .map(move |chunk| async move {
            let index = chunk.index;
            if aborted.load(Ordering::Acquire) {
                return (index, Ok(ChunkResolution::abandoned(chunk, ABORT_REASON)));
            }
            if ctx.deadline_passed() {
                debug!(chunk = index, "Deadline reached, abandoning chunk");
                return (index, Ok(ChunkResolution::abandoned(chunk, DEADLINE_REASON)));
            }

            let resolution = run_chunk(chunk, operation, ctx, policy, Some(bulkhead)).await;
            if resolution.is_err() {
                aborted.store(true, Ordering::Release);
            }
            (index, resolution)
        })
        .buffer_unordered(workers);

    let mut slots: Vec<Option<ChunkResolution<T, R>>> = (0..chunk_count).map(|_| None).collect();
    let mut fatal: Option<BatchError> = None;

    while let Some((index, resolution)) = results.next().await {
        match resolution {
            Ok(resolution) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(resolution);
                }
            }
            Err(error) => {
                error!(chunk = index, error = %error, "Fatal error, aborting unstarted chunks");
                fatal.get_or_insert(error);
            }
        }
    }
    drop(results);

    // Chunks that ran before a fatal error still count in metrics
    for resolution in slots.into_iter().flatten() {
        if fatal.is_some() && matches!(resolution, ChunkResolution::Abandoned { .. }) {
            continue;
        }
        ctx.settle(&mut assembler, resolution, None);
    }

    match fatal {
        Some(error) => Err(error),
        None => Ok(assembler.finish(false)),
    }
}
