//! Push event domain types

use serde::{Deserialize, Serialize};

use crate::dto::webhook::PushPayload;

/// A validated push notification
///
/// Constructed once from the inbound webhook payload and consumed by a
/// single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    pub clone_url: String,
    pub owner: String,
    pub repository: String,
    pub commit: String,
}

/// Reasons a webhook payload cannot be turned into a push event
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("field '{field}' has an invalid value: {value}")]
    InvalidField { field: &'static str, value: String },
}

impl PushEvent {
    /// Parses and validates a raw webhook body
    pub fn from_json(body: &[u8]) -> Result<Self, PayloadError> {
        let payload: PushPayload = serde_json::from_slice(body)?;
        Self::try_from(payload)
    }

    /// Commit status endpoint for this event on the given API host
    pub fn status_url(&self, api_base: &str) -> String {
        format!(
            "{}/repos/{}/{}/statuses/{}",
            api_base.trim_end_matches('/'),
            self.owner,
            self.repository,
            self.commit
        )
    }

    /// Key identifying the workspace slot of this event
    pub fn workspace_key(&self) -> String {
        format!("{}-{}", self.repository, self.commit)
    }
}

impl TryFrom<PushPayload> for PushEvent {
    type Error = PayloadError;

    fn try_from(payload: PushPayload) -> Result<Self, Self::Error> {
        let event = PushEvent {
            clone_url: payload.repository.clone_url,
            owner: payload.repository.owner.login,
            repository: payload.repository.name,
            commit: payload.after,
        };

        require_non_empty("repository.clone_url", &event.clone_url)?;
        require_non_empty("repository.owner.login", &event.owner)?;
        require_non_empty("repository.name", &event.repository)?;
        require_non_empty("after", &event.commit)?;

        // Repository name and commit form a filesystem path
        require_path_safe("repository.name", &event.repository)?;
        require_path_safe("repository.owner.login", &event.owner)?;

        if !event.commit.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PayloadError::InvalidField {
                field: "after",
                value: event.commit,
            });
        }

        Ok(event)
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.trim().is_empty() {
        return Err(PayloadError::EmptyField(field));
    }
    Ok(())
}

fn require_path_safe(field: &'static str, value: &str) -> Result<(), PayloadError> {
    if value.contains('/') || value.contains('\\') || value.contains("..") {
        return Err(PayloadError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
