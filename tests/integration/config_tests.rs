//! Configuration and logging integration tests

#[cfg(test)]
mod tests {
    use batchops::config::{
        ENV_BATCH_SIZE, ENV_COLLECT_METRICS, ENV_MAX_WORKERS, ENV_RETRY_DELAY_SECS, ENV_STRATEGY,
        ENV_TIMEOUT_SECS,
    };
    use batchops::{BatchConfig, BatchError, ExecutionStrategy, LogLevel, init_logging};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio_test::{assert_err, assert_ok};

    const VARS: [&str; 6] = [
        ENV_STRATEGY,
        ENV_BATCH_SIZE,
        ENV_MAX_WORKERS,
        ENV_RETRY_DELAY_SECS,
        ENV_TIMEOUT_SECS,
        ENV_COLLECT_METRICS,
    ];

    fn clear_env() {
        for var in VARS {
            // SAFETY: only this test touches the BATCHOPS_* variables
            unsafe { std::env::remove_var(var) };
        }
    }

    /// Environment variables are process-global, so every env case runs here
    #[test]
    fn test_from_env() {
        clear_env();
        let defaults = assert_ok!(BatchConfig::from_env());
        assert_eq!(defaults.execution_strategy, ExecutionStrategy::Chunked);
        assert_eq!(defaults.batch_size, None);

        // SAFETY: see clear_env
        unsafe {
            std::env::set_var(ENV_STRATEGY, "single-query");
            std::env::set_var(ENV_BATCH_SIZE, "250");
            std::env::set_var(ENV_MAX_WORKERS, "8");
            std::env::set_var(ENV_RETRY_DELAY_SECS, "0.5");
            std::env::set_var(ENV_TIMEOUT_SECS, "30");
            std::env::set_var(ENV_COLLECT_METRICS, "off");
        }
        let config = BatchConfig::from_env().unwrap();
        assert_eq!(config.execution_strategy, ExecutionStrategy::SingleQuery);
        assert_eq!(config.batch_size, Some(250));
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert!(!config.collect_metrics);

        // SAFETY: see clear_env
        unsafe { std::env::set_var(ENV_MAX_WORKERS, "0") };
        assert!(matches!(BatchConfig::from_env(), Err(BatchError::Config(_))));

        // SAFETY: see clear_env
        unsafe { std::env::set_var(ENV_MAX_WORKERS, "many") };
        assert_err!(BatchConfig::from_env());

        // SAFETY: see clear_env
        unsafe { std::env::set_var(ENV_MAX_WORKERS, "2") };
        unsafe { std::env::set_var(ENV_TIMEOUT_SECS, "-1") };
        assert_err!(BatchConfig::from_env());

        clear_env();
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"execution_strategy": "optimistic", "batch_size": 64, "retry_count": 1}}"#
        )
        .unwrap();

        let config = BatchConfig::from_file(file.path()).await.unwrap();

        assert_eq!(config.execution_strategy, ExecutionStrategy::Optimistic);
        assert_eq!(config.batch_size, Some(64));
        assert_eq!(config.retry_count, 1);
        assert_eq!(config.max_workers, BatchConfig::default().max_workers);
    }

    #[tokio::test]
    async fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = BatchConfig::from_file(dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }

    #[test]
    fn test_log_levels() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert!("verbose".parse::<LogLevel>().is_err());

        init_logging(Some(LogLevel::Debug));
        assert!(!init_logging(Some(LogLevel::Debug)));
    }
}
