//! GitHub webhook payload DTOs
//!
//! Only the fields the pipeline consumes are declared; everything else in
//! the push payload is ignored during deserialization.

use serde::{Deserialize, Serialize};

/// Body of a `push` webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushPayload {
    pub repository: RepositoryPayload,
    /// Commit the ref points to after the push
    pub after: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryPayload {
    pub clone_url: String,
    pub name: String,
    pub owner: OwnerPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerPayload {
    pub login: String,
}
