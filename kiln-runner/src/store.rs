//! Build record persistence seam
//!
//! The pipeline writes build records through this trait; the server
//! implements it on top of its SQL repository.

use async_trait::async_trait;
use kiln_core::domain::build::BuildRecord;
use kiln_core::domain::status::CommitState;

use crate::error::StoreError;

#[async_trait]
pub trait BuildStore: Send + Sync {
    /// Inserts a record and returns its id
    async fn insert(
        &self,
        commit_identifier: &str,
        build_date: chrono::DateTime<chrono::Utc>,
        status: CommitState,
        test_output: &str,
    ) -> Result<i64, StoreError>;

    /// Sets the final status and output of an existing record
    async fn complete(&self, id: i64, status: CommitState, test_output: &str)
    -> Result<(), StoreError>;

    /// All records ordered by id
    async fn list_all(&self) -> Result<Vec<BuildRecord>, StoreError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<BuildRecord>, StoreError>;
}
