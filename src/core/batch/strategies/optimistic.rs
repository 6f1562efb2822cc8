//! Single un-retried attempt with chunked fallback

use super::chunked::run_sequential;
use super::{DEADLINE_REASON, ExecutionContext};
use crate::core::batch::chunk::{Chunk, ChunkResolution, ResultAssembler, partition};
use crate::core::batch::operation::ChunkOutput;
use crate::core::batch::types::{BatchResult, ExecutionStrategy};
use crate::utils::error::Result;
use serde::Serialize;
use std::future::Future;
use std::time::Instant;
use tracing::{error, info, warn};

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
    let total = records.len();
    let mut assembler = ResultAssembler::new(ExecutionStrategy::Optimistic, total);
    let chunk = Chunk::whole(records);

    if ctx.deadline_passed() {
        ctx.settle(&mut assembler, ChunkResolution::abandoned(chunk, DEADLINE_REASON), None);
        return Ok(assembler.finish(false));
    }

    let started = Instant::now();
    let payload: Vec<T> = chunk.items.iter().map(|item| item.record.clone()).collect();
    let error = match operation(payload).await {
        Ok(output) => {
            let resolution = ChunkResolution::Completed {
                chunk,
                output,
                retries: 0,
                duration: started.elapsed(),
            };
            ctx.settle(&mut assembler, resolution, None);
            return Ok(assembler.finish(false));
        }
        Err(error) if error.is_fatal() => {
            error!(error = %error, "Optimistic attempt hit fatal error");
            ctx.notify_error(&error, 0, 0, total, 1);
            return Err(error);
        }
        Err(error) => error,
    };

    ctx.notify_error(&error, 0, 0, total, 1);
    if total <= 1 {
        warn!(error = %error, "Optimistic attempt rejected, no smaller chunk to fall back to");
        let resolution = ChunkResolution::Exhausted {
            chunk,
            error,
            attempts: 1,
            duration: started.elapsed(),
        };
        ctx.settle(&mut assembler, resolution, None);
        return Ok(assembler.finish(false));
    }

    let records = chunk.into_records();
    let size = fallback_chunk_size(ctx.advisor.resolve(&records, ctx.config), total);
    warn!(
        error = %error,
        fallback_chunk_size = size,
        "Optimistic attempt rejected, falling back to chunked execution"
    );

    let chunks = partition(records, size);
    info!(chunks = chunks.len(), "Executing optimistic fallback");
    let assembler = run_sequential(chunks, operation, ctx, assembler, false).await?;
    Ok(assembler.finish(true))
}

/// Fallback chunks must be smaller than the rejected whole-input attempt
///
/// Only called with more than one record.
fn fallback_chunk_size(resolved: usize, total: usize) -> usize {
    if resolved >= total {
        total.div_ceil(2).max(1)
    } else {
        resolved.max(1)
    }
}
