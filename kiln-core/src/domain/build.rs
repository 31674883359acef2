//! Build domain types

use serde::{Deserialize, Serialize};

use crate::domain::status::CommitState;

/// Persisted record of one pipeline run
///
/// Created by the pipeline orchestrator, read by the history API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub id: i64,
    pub commit_identifier: String,
    pub build_date: chrono::DateTime<chrono::Utc>,
    pub status: CommitState,
    pub test_output: String,
}

/// Verdict of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Compile check and tests both passed
    Success,
    /// The pipeline completed but the compile check or tests failed
    Failure,
    /// The pipeline could not complete
    Error,
}

/// Terminal outcome of a pipeline run together with its captured output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
    pub verdict: Verdict,
    pub output: String,
}

impl BuildOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Success,
            output: output.into(),
        }
    }

    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Failure,
            output: output.into(),
        }
    }

    pub fn error(output: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Error,
            output: output.into(),
        }
    }

    /// Builds the verdict from the two pipeline checks
    pub fn from_checks(build_passed: bool, tests_passed: bool, output: impl Into<String>) -> Self {
        if build_passed && tests_passed {
            Self::success(output)
        } else {
            Self::failure(output)
        }
    }

    /// The commit state this outcome is reported and persisted as
    pub fn state(&self) -> CommitState {
        match self.verdict {
            Verdict::Success => CommitState::Success,
            Verdict::Failure => CommitState::Failure,
            Verdict::Error => CommitState::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_both_checks() {
        assert_eq!(
            BuildOutcome::from_checks(true, true, "").state(),
            CommitState::Success
        );
        assert_eq!(
            BuildOutcome::from_checks(false, true, "").state(),
            CommitState::Failure
        );
        assert_eq!(
            BuildOutcome::from_checks(true, false, "").state(),
            CommitState::Failure
        );
        assert_eq!(
            BuildOutcome::from_checks(false, false, "").state(),
            CommitState::Failure
        );
    }

    #[test]
    fn test_error_maps_to_error_state() {
        let outcome = BuildOutcome::error("clone failed");
        assert_eq!(outcome.state(), CommitState::Error);
        assert_eq!(outcome.output, "clone failed");
    }
}
