//! Strategy integration tests
//!
//! Partial failure, retry bounds, bounded concurrency and fallback behavior
//! observed through the batch facade.

#[cfg(test)]
mod tests {
    use crate::common::assertions::assert_complete_and_ordered;
    use crate::common::{FaultyUserStore, UserFactory, fast_config};
    use batchops::{BatchError, BatchOperations, ChunkStatus, ExecutionStrategy, RecordErrorKind};
    use std::sync::Arc;
    use std::time::Duration;

    const ALL_STRATEGIES: [ExecutionStrategy; 5] = [
        ExecutionStrategy::SingleQuery,
        ExecutionStrategy::Chunked,
        ExecutionStrategy::Parallel,
        ExecutionStrategy::Pipelined,
        ExecutionStrategy::Optimistic,
    ];

    // ==================== Partial Failure ====================

    /// 250 records in chunks of 100 with the final 50-record chunk rejected
    #[tokio::test]
    async fn test_failed_final_chunk_is_isolated() {
        let store = Arc::new(
            FaultyUserStore::new()
                .fail_when(|ids| (ids[0] >= 200).then(|| BatchError::chunk("disk quota"))),
        );
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Chunked, 100));

        let result = ops.batch_insert(UserFactory::many(250), None).await.unwrap();

        assert_eq!(store.chunk_sizes(), vec![100, 100, 50]);
        assert_eq!(result.success_count(), 200);
        assert_eq!(result.failure_count(), 50);
        assert_eq!(result.chunks[2].status, ChunkStatus::Failed);
        assert_complete_and_ordered(&result);
    }

    /// Second chunk rejected; the third chunk still runs
    #[tokio::test]
    async fn test_failed_middle_chunk_does_not_stop_later_chunks() {
        let store = Arc::new(FaultyUserStore::new().fail_when(|ids| {
            (ids[0] == 100).then(|| BatchError::chunk("constraint violation"))
        }));
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Chunked, 100));

        let result = ops.batch_insert(UserFactory::many(250), None).await.unwrap();

        assert_eq!(store.calls(), 3);
        assert_eq!(result.success_count(), 150);
        assert_eq!(result.failure_count(), 100);
        assert_eq!(result.chunks[2].status, ChunkStatus::Succeeded);
        assert!(store.inner().contains(&249));
        assert!(!store.inner().contains(&150));
        assert!(
            result
                .failed
                .iter()
                .all(|f| f.error.kind == RecordErrorKind::ChunkFailed)
        );
    }

    // ==================== Strategy Equivalence ====================

    #[tokio::test]
    async fn test_every_strategy_inserts_everything_in_order() {
        for strategy in ALL_STRATEGIES {
            let store = Arc::new(FaultyUserStore::new());
            let ops = BatchOperations::new(store.clone(), fast_config(strategy, 64));

            let result = ops.batch_insert(UserFactory::many(300), None).await.unwrap();

            assert_eq!(result.strategy, strategy);
            assert_eq!(result.success_count(), 300, "strategy {}", strategy);
            assert_eq!(store.inner().len(), 300);
            let ids: Vec<u64> = result.values().map(|u| u.id).collect();
            assert_eq!(ids, (0..300).collect::<Vec<_>>());
            assert_complete_and_ordered(&result);
        }
    }

    // ==================== Retry ====================

    /// retry_count = N means at most N + 1 attempts per chunk
    #[tokio::test]
    async fn test_retry_bound() {
        let store = Arc::new(
            FaultyUserStore::new().fail_when(|_| Some(BatchError::chunk("always failing"))),
        );
        let config = fast_config(ExecutionStrategy::Chunked, 10)
            .with_retry_count(2)
            .with_retry_delay(Duration::from_millis(1));
        let ops = BatchOperations::new(store.clone(), config);

        let result = ops.batch_insert(UserFactory::many(5), None).await.unwrap();

        assert_eq!(store.calls(), 3);
        assert_eq!(result.failure_count(), 5);
        assert_eq!(result.retries_used(), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let store = Arc::new(
            FaultyUserStore::new().fail_when(|_| Some(BatchError::fatal("connection reset"))),
        );
        let config = fast_config(ExecutionStrategy::Chunked, 10).with_retry_count(5);
        let ops = BatchOperations::new(store.clone(), config);

        let err = ops.batch_insert(UserFactory::many(30), None).await.unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_strategy() {
        for strategy in ALL_STRATEGIES {
            let store = Arc::new(FaultyUserStore::new());
            store.inner().set_available(false);
            let ops = BatchOperations::new(store, fast_config(strategy, 10));

            let err = ops.batch_insert(UserFactory::many(25), None).await.unwrap_err();
            assert!(err.is_fatal(), "strategy {}", strategy);
        }
    }

    // ==================== Parallel ====================

    #[tokio::test]
    async fn test_parallel_respects_max_workers() {
        let store = Arc::new(FaultyUserStore::new().with_latency(Duration::from_millis(5)));
        let config = fast_config(ExecutionStrategy::Parallel, 10).with_max_workers(2);
        let ops = BatchOperations::new(store.clone(), config);

        let result = ops.batch_insert(UserFactory::many(100), None).await.unwrap();

        assert_eq!(store.calls(), 10);
        assert!(store.peak_concurrency() <= 2);
        assert_eq!(result.success_count(), 100);
        assert_complete_and_ordered(&result);
    }

    // ==================== Optimistic ====================

    #[tokio::test]
    async fn test_optimistic_fallback_after_rejection() {
        let store = Arc::new(FaultyUserStore::new().fail_when(|ids| {
            (ids.len() > 100).then(|| BatchError::chunk("statement too large"))
        }));
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Optimistic, 100));

        let result = ops.batch_insert(UserFactory::many(250), None).await.unwrap();

        assert!(result.used_fallback);
        assert_eq!(store.chunk_sizes(), vec![250, 100, 100, 50]);
        assert_eq!(result.success_count(), 250);
        assert_eq!(store.inner().len(), 250);
    }

    #[tokio::test]
    async fn test_optimistic_without_rejection() {
        let store = Arc::new(FaultyUserStore::new());
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Optimistic, 10));

        let result = ops.batch_insert(UserFactory::many(40), None).await.unwrap();

        assert!(!result.used_fallback);
        assert_eq!(store.calls(), 1);
    }

    // ==================== Deadline ====================

    #[tokio::test]
    async fn test_deadline_abandons_unstarted_chunks() {
        let store = Arc::new(FaultyUserStore::new().with_latency(Duration::from_millis(40)));
        let config = fast_config(ExecutionStrategy::Chunked, 10).with_timeout(Duration::from_millis(20));
        let ops = BatchOperations::new(store.clone(), config);

        let result = ops.batch_insert(UserFactory::many(30), None).await.unwrap();

        assert_eq!(store.calls(), 1);
        assert_eq!(result.success_count(), 10);
        assert_eq!(result.failure_count(), 20);
        assert_eq!(result.chunks[1].status, ChunkStatus::Abandoned);
        assert_complete_and_ordered(&result);
    }
}
