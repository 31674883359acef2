//! Build API Handlers
//!
//! Read-only HTTP endpoints over the build history.

use axum::{
    Json,
    extract::{Path, State},
};
use kiln_core::domain::build::BuildRecord;

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::build_service::{self, BuildError};

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::NotFound(id) => ApiError::NotFound(format!("Build {} not found", id)),
            BuildError::StorageError(err) => ApiError::Storage(err),
        }
    }
}

/// GET /builds
/// List every recorded build, oldest first
pub async fn list_builds(State(state): State<AppState>) -> ApiResult<Json<Vec<BuildRecord>>> {
    tracing::debug!("Listing builds");

    let builds = build_service::list_builds(state.store.as_ref()).await?;

    Ok(Json(builds))
}

/// GET /builds/{id}
/// Get one build by ID
pub async fn get_build(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<BuildRecord>> {
    tracing::debug!("Getting build: {}", id);

    let build = build_service::get_build(state.store.as_ref(), id).await?;

    Ok(Json(build))
}
