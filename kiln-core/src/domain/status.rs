//! Commit status domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// State of a commit as reported to the source-control host
///
/// The same vocabulary is used for the persisted status column of a
/// build record. `Pending` is only ever a transient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitState {
    Pending,
    Success,
    Failure,
    Error,
}

impl CommitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Success => "success",
            CommitState::Failure => "failure",
            CommitState::Error => "error",
        }
    }

    /// Human readable description sent alongside the state
    pub fn description(&self) -> &'static str {
        match self {
            CommitState::Pending => "Build started",
            CommitState::Success => "Build and tests passed",
            CommitState::Failure => "Build or tests failed",
            CommitState::Error => "Build could not be completed",
        }
    }

    /// Whether this state ends a pipeline run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommitState::Pending)
    }
}

impl fmt::Display for CommitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown commit state: {0}")]
pub struct UnknownState(pub String);

impl FromStr for CommitState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CommitState::Pending),
            "success" => Ok(CommitState::Success),
            "failure" => Ok(CommitState::Failure),
            "error" => Ok(CommitState::Error),
            other => Err(UnknownState(other.to_string())),
        }
    }
}
