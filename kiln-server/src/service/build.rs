//! Build Service
//!
//! Read access to the build history, through the same store the pipeline
//! writes to.

use kiln_core::domain::build::BuildRecord;
use kiln_runner::{BuildStore, StoreError};

/// Service error type
#[derive(Debug)]
pub enum BuildError {
    NotFound(i64),
    StorageError(StoreError),
}

impl From<StoreError> for BuildError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => BuildError::NotFound(id),
            other => BuildError::StorageError(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;

/// Get a build by ID
pub async fn get_build(store: &dyn BuildStore, id: i64) -> Result<BuildRecord> {
    let build = store
        .get_by_id(id)
        .await?
        .ok_or(BuildError::NotFound(id))?;

    Ok(build)
}

/// List all builds
pub async fn list_builds(store: &dyn BuildStore) -> Result<Vec<BuildRecord>> {
    let builds = store.list_all().await?;
    Ok(builds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::repository::build_repository::SqliteBuildStore;
    use kiln_core::domain::status::CommitState;

    async fn store() -> SqliteBuildStore {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        SqliteBuildStore::new(pool)
    }

    #[tokio::test]
    async fn test_get_missing_build_is_not_found() {
        let store = store().await;

        let result = get_build(&store, 1).await;
        assert!(matches!(result, Err(BuildError::NotFound(1))));

        store
            .insert("abc123", chrono::Utc::now(), CommitState::Success, "")
            .await
            .unwrap();
        assert_eq!(get_build(&store, 1).await.unwrap().commit_identifier, "abc123");
        assert_eq!(list_builds(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_storage_error() {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let store = SqliteBuildStore::new(pool.clone());
        pool.close().await;

        let result = list_builds(&store).await;

        assert!(matches!(result, Err(BuildError::StorageError(_))));
    }
}
