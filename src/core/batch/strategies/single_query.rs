//! Whole input in one collaborator call

use super::{DEADLINE_REASON, ExecutionContext};
use crate::core::batch::chunk::{Chunk, ChunkResolution, ResultAssembler, run_chunk};
use crate::core::batch::operation::ChunkOutput;
use crate::core::batch::types::{BatchResult, ExecutionStrategy};
use crate::utils::error::Result;
use std::future::Future;
use tracing::error;

pub(super) async fn execute<T, R, F, Fut>(
    records: Vec<T>,
    operation: &F,
    ctx: &ExecutionContext<'_, T, R>,
) -> Result<BatchResult<T, R>>
where
    T: Clone,
    F: Fn(Vec<T>) -> Fut,
    Fut: Future<Output = Result<ChunkOutput<R>>>,
{
    let mut assembler = ResultAssembler::new(ExecutionStrategy::SingleQuery, records.len());
    let chunk = Chunk::whole(records);

    let resolution = if ctx.deadline_passed() {
        ChunkResolution::abandoned(chunk, DEADLINE_REASON)
    } else {
        run_chunk(chunk, operation, ctx, &ctx.retry_policy(), None)
            .await
            .inspect_err(|e| error!(error = %e, "Single-query batch aborted"))?
    };

    ctx.settle(&mut assembler, resolution, None);
    Ok(assembler.finish(false))
}
