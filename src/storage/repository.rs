//! Repository-style wrapper over [`BatchOperations`]

use super::BatchStore;
use crate::core::batch::{BatchConfig, BatchOperations, BatchResult, FetchResult};
use crate::utils::error::Result;
use std::sync::Arc;

/// Entity repository exposing the batch facade under repository names
pub struct BatchRepository<S: BatchStore> {
    operations: BatchOperations<S>,
}

impl<S: BatchStore> BatchRepository<S> {
    pub fn new(store: Arc<S>, config: BatchConfig) -> Self {
        Self {
            operations: BatchOperations::new(store, config),
        }
    }

    pub fn from_operations(operations: BatchOperations<S>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &BatchOperations<S> {
        &self.operations
    }

    pub async fn batch_add(
        &self,
        entities: Vec<S::Record>,
    ) -> Result<BatchResult<S::Record, S::Record>> {
        self.operations.batch_insert(entities, None).await
    }

    pub async fn batch_update(
        &self,
        entities: Vec<S::Record>,
        fields: Option<&[String]>,
    ) -> Result<BatchResult<S::Record, S::Record>> {
        self.operations.batch_update(entities, fields, None).await
    }

    pub async fn batch_get(&self, ids: Vec<S::Id>) -> Result<FetchResult<S::Id, S::Record>> {
        self.operations.batch_get(ids, None, None).await
    }

    pub async fn batch_remove(&self, ids: Vec<S::Id>) -> Result<BatchResult<S::Id, ()>> {
        self.operations.batch_remove(ids, None).await
    }
}
