//! Sequential chunk execution

use super::pipelined::{self, Prepared};
use super::{DEADLINE_REASON, ExecutionContext};
use crate::core::batch::chunk::{Chunk, ChunkResolution, ResultAssembler, partition, run_chunk};
use crate::core::batch::operation::ChunkOutput;
use crate::core::batch::types::{BatchResult, ExecutionStrategy};
use crate::utils::error::Result;
use serde::Serialize;
use std::future::Future;
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
    let assembler = ResultAssembler::new(ExecutionStrategy::Chunked, records.len());
    let chunks = partition(records, size);
    info!(chunks = chunks.len(), chunk_size = size, "Executing chunked batch");

    let assembler = run_sequential(chunks, operation, ctx, assembler, false).await?;
    Ok(assembler.finish(false))
}

/// Run chunks one after another, optionally through the pipeline hooks
///
/// A chunk failure never stops later chunks; a fatal error returns at once
/// and leaves the remaining chunks unstarted.
pub(super) async fn run_sequential<T, R, F, Fut>(
    chunks: Vec<Chunk<T>>,
    operation: &F,
    ctx: &ExecutionContext<'_, T, R>,
    mut assembler: ResultAssembler<T, R>,
    staged: bool,
) -> Result<ResultAssembler<T, R>>
where
    T: Clone,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<ChunkOutput<R>>>,
{
    let policy = ctx.retry_policy();
    let post_process = if staged {
        ctx.hooks.post_process.as_deref()
    } else {
        None
    };

    for chunk in chunks {
        if ctx.deadline_passed() {
            debug!(chunk = chunk.index, "Deadline reached, abandoning chunk");
            ctx.settle(
                &mut assembler,
                ChunkResolution::abandoned(chunk, DEADLINE_REASON),
                None,
            );
            continue;
        }

        let chunk = if staged {
            match pipelined::prepare(chunk, ctx)? {
                Prepared::Ready(chunk) => chunk,
                Prepared::Skip(resolution) => {
                    ctx.settle(&mut assembler, resolution, None);
                    continue;
                }
            }
        } else {
            chunk
        };

        let chunk_index = chunk.index;
        let resolution = run_chunk(chunk, operation, ctx, &policy, None)
            .await
            .inspect_err(|e| {
                error!(chunk = chunk_index, error = %e, "Fatal error, aborting remaining chunks")
            })?;
        ctx.settle(&mut assembler, resolution, post_process);
    }

    Ok(assembler)
}
