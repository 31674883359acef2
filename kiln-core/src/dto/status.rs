//! Commit status DTOs

use serde::{Deserialize, Serialize};

use crate::domain::status::CommitState;

/// Body of a `POST /repos/{owner}/{repo}/statuses/{sha}` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub state: CommitState,
    pub description: String,
    pub context: String,
}

impl StatusRequest {
    pub fn new(state: CommitState, context: impl Into<String>) -> Self {
        Self {
            state,
            description: state.description().to_string(),
            context: context.into(),
        }
    }
}
