//! Build Repository
//!
//! Handles all database operations related to build records.

use async_trait::async_trait;
use kiln_core::domain::build::BuildRecord;
use kiln_core::domain::status::CommitState;
use kiln_runner::{BuildStore, StoreError};
use sqlx::SqlitePool;

/// Insert a new build record and return its id
pub async fn insert(
    pool: &SqlitePool,
    commit_identifier: &str,
    build_date: chrono::DateTime<chrono::Utc>,
    status: CommitState,
    test_output: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO builds (commit_identifier, build_date, status, test_output)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(commit_identifier)
    .bind(build_date)
    .bind(status.as_str())
    .bind(test_output)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Set the final status and output of a build
pub async fn complete(
    pool: &SqlitePool,
    id: i64,
    status: CommitState,
    test_output: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE builds
        SET status = ?, test_output = ?
        WHERE id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(test_output)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Find a build by ID
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<BuildRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, BuildRow>(
        r#"
        SELECT id, commit_identifier, build_date, status, test_output
        FROM builds
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// List all builds, oldest first
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<BuildRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BuildRow>(
        r#"
        SELECT id, commit_identifier, build_date, status, test_output
        FROM builds
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Pipeline Store Adapter
// =============================================================================

/// `BuildStore` over the SQLite pool, handed to the pipeline orchestrator
#[derive(Debug, Clone)]
pub struct SqliteBuildStore {
    pool: SqlitePool,
}

impl SqliteBuildStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(Box::new(err))
}

#[async_trait]
impl BuildStore for SqliteBuildStore {
    async fn insert(
        &self,
        commit_identifier: &str,
        build_date: chrono::DateTime<chrono::Utc>,
        status: CommitState,
        test_output: &str,
    ) -> Result<i64, StoreError> {
        insert(&self.pool, commit_identifier, build_date, status, test_output)
            .await
            .map_err(backend)
    }

    async fn complete(
        &self,
        id: i64,
        status: CommitState,
        test_output: &str,
    ) -> Result<(), StoreError> {
        let updated = complete(&self.pool, id, status, test_output)
            .await
            .map_err(backend)?;

        if !updated {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<BuildRecord>, StoreError> {
        list_all(&self.pool).await.map_err(backend)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BuildRecord>, StoreError> {
        find_by_id(&self.pool, id).await.map_err(backend)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct BuildRow {
    id: i64,
    commit_identifier: String,
    build_date: chrono::DateTime<chrono::Utc>,
    status: String,
    test_output: String,
}

impl From<BuildRow> for BuildRecord {
    fn from(row: BuildRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|e| {
            tracing::warn!("Build {} has {}, reading it as error", row.id, e);
            CommitState::Error
        });

        BuildRecord {
            id: row.id,
            commit_identifier: row.commit_identifier,
            build_date: row.build_date,
            status,
            test_output: row.test_output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn pool() -> SqlitePool {
        let pool = db::create_pool("sqlite::memory:").await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_insert_and_query_builds() {
        let pool = pool().await;
        let build_date = chrono::DateTime::parse_from_rfc3339("2023-10-10T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);

        let id = insert(&pool, "abc123", build_date, CommitState::Success, "3 passed")
            .await
            .unwrap();

        let build = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(build.id, id);
        assert_eq!(build.commit_identifier, "abc123");
        assert_eq!(build.build_date, build_date);
        assert_eq!(build.status, CommitState::Success);
        assert_eq!(build.test_output, "3 passed");

        let builds = list_all(&pool).await.unwrap();
        assert_eq!(builds, vec![build]);
    }

    #[tokio::test]
    async fn test_ids_increase() {
        let pool = pool().await;
        let now = chrono::Utc::now();

        let first = insert(&pool, "aaa", now, CommitState::Failure, "").await.unwrap();
        let second = insert(&pool, "bbb", now, CommitState::Error, "").await.unwrap();

        assert!(second > first);
        let ids: Vec<i64> = list_all(&pool).await.unwrap().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![first, second]);
    }

    #[tokio::test]
    async fn test_missing_build_is_none() {
        let pool = pool().await;
        assert!(find_by_id(&pool, 42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_complete_updates_status_and_output() {
        let pool = pool().await;
        let id = insert(&pool, "abc123", chrono::Utc::now(), CommitState::Pending, "")
            .await
            .unwrap();

        assert!(complete(&pool, id, CommitState::Failure, "1 failed").await.unwrap());

        let build = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(build.status, CommitState::Failure);
        assert_eq!(build.test_output, "1 failed");
        assert!(!complete(&pool, id + 1, CommitState::Success, "").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_reports_missing_record_on_complete() {
        let store = SqliteBuildStore::new(pool().await);

        let result = store.complete(7, CommitState::Success, "").await;

        assert!(matches!(result, Err(StoreError::NotFound(7))));
    }
}
