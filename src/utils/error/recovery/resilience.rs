//! Resilience patterns for resource isolation

use crate::utils::error::{BatchError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;

/// Bulkhead pattern for bounding concurrent collaborator calls
#[derive(Debug, Clone)]
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
    name: String,
    max_concurrent: usize,
}

impl Bulkhead {
    /// Create a new bulkhead
    pub fn new(name: impl Into<String>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            name: name.into(),
            max_concurrent,
        }
    }

    /// Execute a future while holding one permit
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: Future<Output = R>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| BatchError::Internal(format!("Bulkhead acquire failed: {}", e)))?;

        trace!("Bulkhead '{}' acquired permit", self.name);
        let result = f.await;
        trace!("Bulkhead '{}' released permit", self.name);

        Ok(result)
    }

    /// Get available permits
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get maximum concurrent operations
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
