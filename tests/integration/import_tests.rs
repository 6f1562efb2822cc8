//! Import integration tests: deduplication, conflicts and stats

#[cfg(test)]
mod tests {
    use crate::common::assertions::assert_complete_and_ordered;
    use crate::common::{FaultyUserStore, UserFactory, fast_config};
    use batchops::{
        BatchError, BatchOperations, ExecutionStrategy, ImportOptions, OperationKind,
        RecordErrorKind, SkipReason,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn by_email() -> ImportOptions {
        ImportOptions::new(["email"])
    }

    // ==================== Conflicts ====================

    /// A conflicting key becomes an update instead of an insert
    #[tokio::test]
    async fn test_update_on_conflict() {
        let store = Arc::new(FaultyUserStore::with_users(UserFactory::many(3)));
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Chunked, 10));

        let records = vec![
            UserFactory::with_email(100, "user0@example.com"),
            UserFactory::create(5),
        ];
        let outcome = ops
            .batch_import(records, &by_email().update_on_conflict(true), None)
            .await
            .unwrap();

        let stats = outcome.stats.unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.skipped, 0);
        assert_eq!(store.inner().len(), 4);
        assert!(store.inner().contains(&100));
        assert!(!store.inner().contains(&0));
        assert_complete_and_ordered(&outcome.result);
    }

    #[tokio::test]
    async fn test_conflict_skipped_without_update() {
        let store = Arc::new(FaultyUserStore::with_users(UserFactory::many(3)));
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Chunked, 10));

        let records = vec![
            UserFactory::with_email(100, "user1@example.com"),
            UserFactory::create(7),
        ];
        let outcome = ops.batch_import(records, &by_email(), None).await.unwrap();

        let stats = outcome.stats.unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(outcome.result.skipped[0].index, 0);
        assert_eq!(outcome.result.skipped[0].reason, SkipReason::Conflict);
        assert!(!store.inner().contains(&100));
        assert_eq!(store.inner().find(&1).unwrap().email, "user1@example.com");
    }

    // ==================== Deduplication ====================

    #[tokio::test]
    async fn test_duplicates_within_input_keep_first() {
        let store = Arc::new(FaultyUserStore::new());
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Parallel, 2));

        let records = vec![
            UserFactory::with_email(1, "dup@example.com"),
            UserFactory::create(2),
            UserFactory::with_email(3, "dup@example.com"),
            UserFactory::with_email(4, "dup@example.com"),
        ];
        let outcome = ops.batch_import(records, &by_email(), None).await.unwrap();

        let stats = outcome.stats.unwrap();
        assert_eq!(stats.inserted, 2);
        assert_eq!(stats.skipped, 2);
        let skipped: Vec<usize> = outcome.result.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![2, 3]);
        assert!(
            outcome
                .result
                .skipped
                .iter()
                .all(|s| s.reason == SkipReason::Duplicate)
        );
        assert!(store.inner().contains(&1));
        assert!(!store.inner().contains(&3));
        assert_complete_and_ordered(&outcome.result);
    }

    // ==================== Options ====================

    #[tokio::test]
    async fn test_stats_omitted_when_not_requested() {
        let store = Arc::new(FaultyUserStore::new());
        let ops = BatchOperations::new(store, fast_config(ExecutionStrategy::Chunked, 10));

        let outcome = ops
            .batch_import(UserFactory::many(5), &by_email().return_stats(false), None)
            .await
            .unwrap();

        assert!(outcome.stats.is_none());
        assert_eq!(outcome.result.success_count(), 5);
    }

    #[tokio::test]
    async fn test_empty_import() {
        let store = Arc::new(FaultyUserStore::new());
        let ops = BatchOperations::new(store.clone(), fast_config(ExecutionStrategy::Chunked, 10));

        let outcome = ops.batch_import(Vec::new(), &by_email(), None).await.unwrap();

        assert_eq!(outcome.result.total, 0);
        assert_eq!(outcome.stats, Some(Default::default()));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_import_recorded_as_one_batch() {
        let store = Arc::new(FaultyUserStore::with_users(UserFactory::many(2)));
        let ops = BatchOperations::new(store, fast_config(ExecutionStrategy::Chunked, 10));

        let records = vec![
            UserFactory::with_email(50, "user0@example.com"),
            UserFactory::create(8),
            UserFactory::create(9),
        ];
        ops.batch_import(records, &by_email(), None).await.unwrap();

        let snapshot = ops.get_metrics();
        let last = snapshot.last_batch.unwrap();
        assert_eq!(snapshot.recent_batches.len(), 1);
        assert_eq!(last.operation, OperationKind::Import);
        assert_eq!(last.succeeded, 2);
        assert_eq!(last.skipped, 1);
        assert_eq!(last.records, 3);
    }

    // ==================== Key lookup ====================

    /// A lookup that keeps failing fails the keyed records instead of the call
    #[tokio::test]
    async fn test_failed_key_lookup_fails_keyed_records() {
        let store = Arc::new(
            FaultyUserStore::with_users(UserFactory::many(3))
                .fail_lookups_with(|| BatchError::chunk("lookup deadlock")),
        );
        let config = fast_config(ExecutionStrategy::Chunked, 10).with_retry_count(1);
        let ops = BatchOperations::new(store.clone(), config);

        let records = vec![
            UserFactory::with_email(100, "user0@example.com"),
            UserFactory::create(5),
        ];
        let outcome = ops
            .batch_import(records, &by_email().update_on_conflict(true), None)
            .await
            .unwrap();

        assert_eq!(store.lookups(), 2);
        assert_eq!(store.calls(), 0);
        let stats = outcome.stats.unwrap();
        assert_eq!(stats.inserted, 0);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.failed, 2);
        for failure in &outcome.result.failed {
            assert_eq!(failure.error.kind, RecordErrorKind::ChunkFailed);
            assert!(failure.error.message.contains("lookup deadlock"));
        }
        assert!(!store.inner().contains(&100));
        assert_complete_and_ordered(&outcome.result);

        let last = ops.get_metrics().last_batch.unwrap();
        assert_eq!(last.failed, 2);
        assert_eq!(last.records, 2);
    }

    #[tokio::test]
    async fn test_fatal_key_lookup_is_raised() {
        let store = Arc::new(
            FaultyUserStore::new().fail_lookups_with(|| BatchError::fatal("connection lost")),
        );
        let config = fast_config(ExecutionStrategy::Chunked, 10).with_retry_count(3);
        let ops = BatchOperations::new(store.clone(), config);

        let err = ops
            .batch_import(UserFactory::many(4), &by_email(), None)
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(store.lookups(), 1);
        assert_eq!(store.calls(), 0);
    }

    // ==================== Deadline ====================

    /// One deadline covers the lookup and both phases
    #[tokio::test]
    async fn test_import_deadline_abandons_everything_once_passed() {
        let store = Arc::new(FaultyUserStore::with_users(UserFactory::many(2)));
        let config = fast_config(ExecutionStrategy::Chunked, 10).with_timeout(Duration::ZERO);
        let ops = BatchOperations::new(store.clone(), config);

        let records = vec![
            UserFactory::with_email(50, "user0@example.com"),
            UserFactory::create(8),
            UserFactory::create(9),
        ];
        let outcome = ops
            .batch_import(records, &by_email().update_on_conflict(true), None)
            .await
            .unwrap();

        assert_eq!(store.lookups(), 0);
        assert_eq!(store.calls(), 0);
        assert_eq!(outcome.result.failure_count(), 3);
        assert!(
            outcome
                .result
                .failed
                .iter()
                .all(|f| f.error.kind == RecordErrorKind::Abandoned)
        );
        assert!(store.inner().contains(&0));
        assert!(!store.inner().contains(&8));
        assert_complete_and_ordered(&outcome.result);
    }
}
