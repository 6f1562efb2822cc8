//! Storage collaborators for the batch facade
//!
//! [`BatchStore`] is the seam between the batch engine and a concrete backend.
//! Each method receives one chunk and reports one outcome per submitted item.

pub mod memory;
pub mod repository;

pub use memory::{Entity, InMemoryStore};
pub use repository::BatchRepository;

use crate::core::batch::{ChunkOutput, UniqueKey};
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::HashSet;

/// Chunk-level storage operations used by [`BatchOperations`](crate::core::batch::BatchOperations)
///
/// Return `Err(BatchError::FatalInfrastructure(..))` when the backend is
/// unreachable; any other `Err` fails the chunk and is retried.
#[async_trait::async_trait]
pub trait BatchStore: Send + Sync {
    type Record: Clone + Serialize + Send + Sync + 'static;
    type Id: Clone + Serialize + Send + Sync + 'static;

    /// Insert new records
    async fn insert(&self, records: Vec<Self::Record>) -> Result<ChunkOutput<Self::Record>>;

    /// Update existing records, writing only `fields` when given
    async fn update(
        &self,
        records: Vec<Self::Record>,
        fields: Option<&[String]>,
    ) -> Result<ChunkOutput<Self::Record>>;

    /// Insert or replace records
    async fn upsert(&self, records: Vec<Self::Record>) -> Result<ChunkOutput<Self::Record>>;

    /// Delete records by id
    async fn delete(&self, ids: Vec<Self::Id>) -> Result<ChunkOutput<()>>;

    /// Fetch records by id; `Ok(None)` marks an id with no stored record
    async fn get(
        &self,
        ids: Vec<Self::Id>,
        load_relations: Option<&[String]>,
    ) -> Result<ChunkOutput<Option<Self::Record>>>;

    /// Subset of `keys` already present for `unique_fields`
    async fn existing_keys(
        &self,
        unique_fields: &[String],
        keys: Vec<UniqueKey>,
    ) -> Result<HashSet<UniqueKey>>;

    /// Overwrite the stored records that share each record's unique key
    ///
    /// The match is on `unique_fields`, not on the record id: an imported
    /// record may carry a new id for an already stored key.
    async fn update_matching(
        &self,
        records: Vec<Self::Record>,
        unique_fields: &[String],
    ) -> Result<ChunkOutput<Self::Record>>;
}
