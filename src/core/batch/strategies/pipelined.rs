//! Staged chunk execution: pre-process, operation, post-process

use super::ExecutionContext;
use super::chunked::run_sequential;
use crate::core::batch::chunk::{Chunk, ChunkResolution, ResultAssembler, partition};
use crate::core::batch::operation::ChunkOutput;
use crate::core::batch::types::{BatchResult, ExecutionStrategy, SkipReason};
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use tracing::{debug, info, warn};

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
    let assembler = ResultAssembler::new(ExecutionStrategy::Pipelined, records.len());
    let chunks = partition(records, size);
    info!(
        chunks = chunks.len(),
        chunk_size = size,
        pre_process = ctx.hooks.pre_process.is_some(),
        post_process = ctx.hooks.post_process.is_some(),
        "Executing pipelined batch"
    );

    let assembler = run_sequential(chunks, operation, ctx, assembler, true).await?;
    Ok(assembler.finish(false))
}

/// Outcome of the pre-processing stage for one chunk
pub(super) enum Prepared<T, R> {
    Ready(Chunk<T>),
    Skip(ChunkResolution<T, R>),
}

/// Apply the pre-processing hook to a chunk
///
/// Records the hook drops are skipped as filtered. Returned records with an
/// index outside the chunk, or repeating an index, are ignored. A hook error
/// skips the whole chunk, except a fatal one which aborts the call.
pub(super) fn prepare<T: Clone, R>(
    chunk: Chunk<T>,
    ctx: &ExecutionContext<'_, T, R>,
) -> Result<Prepared<T, R>> {
    let Some(pre_process) = ctx.hooks.pre_process.as_ref() else {
        return Ok(Prepared::Ready(chunk));
    };

    let returned = match pre_process(chunk.items.clone()) {
        Ok(returned) => returned,
        Err(error) if error.is_fatal() => return Err(error),
        Err(error) => {
            warn!(chunk = chunk.index, error = %error, "Pre-processing rejected chunk");
            return Ok(Prepared::Skip(ChunkResolution::Skipped {
                chunk,
                reason: SkipReason::Validation(error.to_string()),
            }));
        }
    };

    let Chunk {
        index,
        offset,
        items,
        mut filtered,
    } = chunk;

    let mut pending: HashSet<usize> = items.iter().map(|item| item.index).collect();
    let mut kept = Vec::with_capacity(returned.len());
    for item in returned {
        if pending.remove(&item.index) {
            kept.push(item);
        } else {
            debug!(chunk = index, record = item.index, "Ignoring unknown record from pre-processing");
        }
    }
    kept.sort_by_key(|item| item.index);
    filtered.extend(items.into_iter().filter(|item| pending.contains(&item.index)));

    let chunk = Chunk {
        index,
        offset,
        items: kept,
        filtered,
    };

    if chunk.items.is_empty() {
        debug!(chunk = index, "Pre-processing left chunk empty, skipping");
        return Ok(Prepared::Skip(ChunkResolution::Skipped {
            chunk,
            reason: SkipReason::Filtered,
        }));
    }

    Ok(Prepared::Ready(chunk))
}
