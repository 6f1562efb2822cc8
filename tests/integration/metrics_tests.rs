//! Metrics integration tests

#[cfg(test)]
mod tests {
    use crate::common::{FaultyUserStore, UserFactory, fast_config};
    use batchops::{
        BatchError, BatchExecutor, BatchOperations, ExecutionStrategy, MetricsCollector,
        OperationKind,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_facade_records_batches() {
        let store = Arc::new(FaultyUserStore::new().fail_when(|ids| {
            ids.contains(&15).then(|| BatchError::chunk("rejected"))
        }));
        let ops = BatchOperations::new(store, fast_config(ExecutionStrategy::Chunked, 10));

        ops.batch_insert(UserFactory::many(30), None).await.unwrap();
        ops.batch_delete(vec![0, 1], None).await.unwrap();

        let snapshot = ops.get_metrics();
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.recent_batches.len(), 2);
        assert_eq!(snapshot.recent_batches[0].operation, OperationKind::Insert);
        assert_eq!(snapshot.recent_batches[0].failed_chunks, 1);

        let last = snapshot.last_batch.unwrap();
        assert_eq!(last.operation, OperationKind::Delete);
        assert_eq!(last.succeeded, 2);

        let cumulative = snapshot.cumulative;
        assert_eq!(cumulative.batches_finished, 2);
        assert_eq!(cumulative.succeeded, 22);
        assert_eq!(cumulative.failed, 10);
        assert_eq!(cumulative.chunks, 4);
        assert_eq!(cumulative.by_operation[&OperationKind::Insert].records, 30);
        crate::assert_approx_eq!(cumulative.success_rate(), 22.0 / 32.0, 1e-9);
    }

    #[tokio::test]
    async fn test_export_is_json() {
        let store = Arc::new(FaultyUserStore::new());
        let ops = BatchOperations::new(store, fast_config(ExecutionStrategy::Parallel, 5));

        ops.batch_insert(UserFactory::many(12), None).await.unwrap();

        let exported = ops.executor().metrics().export();
        assert_eq!(exported["last_batch"]["operation"], "insert");
        assert_eq!(exported["last_batch"]["strategy"], "parallel");
        assert_eq!(exported["last_batch"]["chunks"], 3);
        assert_eq!(exported["cumulative"]["succeeded"], 12);
    }

    #[tokio::test]
    async fn test_collection_can_be_disabled() {
        let store = Arc::new(FaultyUserStore::new());
        let config = fast_config(ExecutionStrategy::Chunked, 5).with_collect_metrics(false);
        let ops = BatchOperations::new(store, config);

        ops.batch_insert(UserFactory::many(12), None).await.unwrap();

        let snapshot = ops.get_metrics();
        assert!(snapshot.last_batch.is_none());
        assert_eq!(snapshot.cumulative.batches_started, 0);
    }

    /// Two facades over one collector report into the same totals
    #[tokio::test]
    async fn test_shared_collector() {
        let collector = Arc::new(MetricsCollector::new());
        let config = fast_config(ExecutionStrategy::Chunked, 10);
        let users = BatchOperations::with_executor(
            Arc::new(FaultyUserStore::new()),
            BatchExecutor::new(config.clone()).with_metrics(collector.clone()),
        );
        let archive = BatchOperations::with_executor(
            Arc::new(FaultyUserStore::new()),
            BatchExecutor::new(config).with_metrics(collector.clone()),
        );

        users.batch_insert(UserFactory::many(4), None).await.unwrap();
        archive.batch_insert(UserFactory::many(6), None).await.unwrap();

        let snapshot = collector.get_metrics();
        assert_eq!(snapshot.cumulative.batches_finished, 2);
        assert_eq!(snapshot.cumulative.succeeded, 10);

        collector.reset();
        assert!(users.get_metrics().last_batch.is_none());
    }
}
