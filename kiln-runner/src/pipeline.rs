//! Pipeline orchestration
//!
//! Drives one push event through clone, compile check and tests, reports the
//! terminal commit state and persists the build record.
//!
//! State machine of a run:
//!
//! ```text
//! START -> PENDING -> WORKSPACE_READY -> VERIFIED+TESTED -> SUCCESS | FAILURE
//!             \______________\_________________\__________> ERROR
//! ```
//!
//! `pending` is reported by the webhook dispatcher before the run is
//! spawned. Every run ends in exactly one terminal report and one record.

use std::sync::Arc;

use kiln_client::StatusReporter;
use kiln_core::domain::build::BuildOutcome;
use kiln_core::domain::push::PushEvent;
use kiln_core::domain::status::CommitState;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::environment::{EnvironmentProvisioner, VenvProvisioner};
use crate::error::PipelineError;
use crate::locks::CommitLocks;
use crate::store::BuildStore;
use crate::test_runner::{PytestRunner, TestReport, TestRunner};
use crate::verify::{BuildVerifier, PyCompileVerifier, VerifyReport};
use crate::workspace::{GitWorkspaceManager, WorkspaceManager};

/// The steps a pipeline run is made of
#[derive(Clone)]
pub struct PipelineSteps {
    pub workspaces: Arc<dyn WorkspaceManager>,
    pub provisioner: Arc<dyn EnvironmentProvisioner>,
    pub verifier: Arc<dyn BuildVerifier>,
    pub tests: Arc<dyn TestRunner>,
}

impl PipelineSteps {
    /// Subprocess-backed steps: git, venv, py_compile and pytest
    pub fn standard(config: &PipelineConfig) -> Self {
        let provisioner: Arc<dyn EnvironmentProvisioner> =
            Arc::new(VenvProvisioner::new(config.python.clone()));

        Self {
            workspaces: Arc::new(GitWorkspaceManager::new(
                config.workspace_root.clone(),
                config.git.clone(),
            )),
            provisioner: Arc::clone(&provisioner),
            verifier: Arc::new(PyCompileVerifier::new()),
            tests: Arc::new(PytestRunner::new(provisioner)),
        }
    }
}

/// Runs pipelines for push events
pub struct PipelineOrchestrator {
    steps: PipelineSteps,
    reporter: Arc<dyn StatusReporter>,
    store: Arc<dyn BuildStore>,
    locks: CommitLocks,
    status_api_url: String,
}

impl PipelineOrchestrator {
    /// # Arguments
    /// * `steps` - Pipeline step implementations
    /// * `reporter` - Destination of commit statuses
    /// * `store` - Destination of build records
    /// * `status_api_url` - Base URL status endpoints are derived from
    pub fn new(
        steps: PipelineSteps,
        reporter: Arc<dyn StatusReporter>,
        store: Arc<dyn BuildStore>,
        status_api_url: impl Into<String>,
    ) -> Self {
        Self {
            steps,
            reporter,
            store,
            locks: CommitLocks::new(),
            status_api_url: status_api_url.into(),
        }
    }

    /// Status endpoint for `event`
    pub fn status_url(&self, event: &PushEvent) -> String {
        event.status_url(&self.status_api_url)
    }

    /// Reports `state` for the commit of `event`
    ///
    /// The outcome of the report is only logged; it never affects the run.
    pub async fn report_status(&self, event: &PushEvent, state: CommitState) {
        let url = self.status_url(event);
        match self.reporter.report(&url, state).await {
            Ok(code) if (200..300).contains(&code) => {
                info!("Reported '{}' for {} (HTTP {})", state, event.commit, code);
            }
            Ok(code) => {
                warn!(
                    "Status host rejected '{}' for {} (HTTP {})",
                    state, event.commit, code
                );
            }
            Err(e) => {
                warn!("Failed to report '{}' for {}: {}", state, event.commit, e);
            }
        }
    }

    /// Runs the pipeline for `event` to completion
    ///
    /// Never fails: every fault is folded into an `Error` outcome, which is
    /// reported and persisted like any other.
    pub async fn run(self: Arc<Self>, event: PushEvent) -> BuildOutcome {
        let run_id = Uuid::new_v4();
        info!(
            "Run {} started for {}/{} at {}",
            run_id, event.owner, event.repository, event.commit
        );

        let record_id = match self
            .store
            .insert(&event.commit, chrono::Utc::now(), CommitState::Pending, "")
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Run {}: failed to record pending build: {}", run_id, e);
                None
            }
        };

        // A panicking step must still end in a reported, persisted error
        let task = {
            let this = Arc::clone(&self);
            let event = event.clone();
            tokio::spawn(async move { this.execute(&event).await })
        };

        let outcome = match task.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                error!("Run {} failed: {}", run_id, e);
                BuildOutcome::error(e.to_string())
            }
            Err(e) => {
                let e = PipelineError::Aborted(e.to_string());
                error!("Run {} failed: {}", run_id, e);
                BuildOutcome::error(e.to_string())
            }
        };

        info!("Run {} finished: {}", run_id, outcome.state());

        self.report_status(&event, outcome.state()).await;
        self.persist(record_id, &event, &outcome).await;

        outcome
    }

    async fn execute(&self, event: &PushEvent) -> Result<BuildOutcome, PipelineError> {
        // TODO: bound clone, install and test time once a per-step timeout
        // is configurable; a hung subprocess currently blocks this run
        let _guard = self.locks.acquire(&event.workspace_key()).await;

        let workspace = self
            .steps
            .workspaces
            .materialize(&event.clone_url, &event.commit, &event.repository)
            .await?;

        let env = self.steps.provisioner.provision(&workspace).await?;

        // Both checks always run before the verdict
        let build = self.steps.verifier.verify(&workspace, &env).await?;
        let tests = self.steps.tests.run(&workspace, &env).await?;

        Ok(BuildOutcome::from_checks(
            build.passed,
            tests.passed,
            combined_output(&build, &tests),
        ))
    }

    async fn persist(&self, record_id: Option<i64>, event: &PushEvent, outcome: &BuildOutcome) {
        let state = outcome.state();
        let result = match record_id {
            Some(id) => self.store.complete(id, state, &outcome.output).await.map(|_| id),
            None => {
                self.store
                    .insert(&event.commit, chrono::Utc::now(), state, &outcome.output)
                    .await
            }
        };

        match result {
            Ok(id) => info!("Build {} recorded as {}", id, state),
            Err(e) => error!("Failed to record build for {}: {}", event.commit, e),
        }
    }
}

/// Output stored with the build record
///
/// The test output alone, unless the compile check failed, in which case
/// its diagnostics come first.
fn combined_output(build: &VerifyReport, tests: &TestReport) -> String {
    if build.passed {
        return tests.output.clone();
    }
    format!(
        "=== Compile check ===\n{}\n=== Tests ===\n{}",
        build.output.trim_end(),
        tests.output
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{
        FakeProvisioner, FakeTestRunner, FakeVerifier, FakeWorkspaceManager, MemoryBuildStore,
        RecordingReporter,
    };

    struct Harness {
        orchestrator: Arc<PipelineOrchestrator>,
        workspaces: Arc<FakeWorkspaceManager>,
        provisioner: Arc<FakeProvisioner>,
        verifier: Arc<FakeVerifier>,
        tests: Arc<FakeTestRunner>,
        reporter: Arc<RecordingReporter>,
        store: Arc<MemoryBuildStore>,
    }

    fn harness(
        workspaces: FakeWorkspaceManager,
        verifier: FakeVerifier,
        tests: FakeTestRunner,
    ) -> Harness {
        harness_with(workspaces, FakeProvisioner::new(), verifier, tests)
    }

    fn harness_with(
        workspaces: FakeWorkspaceManager,
        provisioner: FakeProvisioner,
        verifier: FakeVerifier,
        tests: FakeTestRunner,
    ) -> Harness {
        let workspaces = Arc::new(workspaces);
        let provisioner = Arc::new(provisioner);
        let verifier = Arc::new(verifier);
        let tests = Arc::new(tests);
        let reporter = Arc::new(RecordingReporter::new());
        let store = Arc::new(MemoryBuildStore::new());

        let steps = PipelineSteps {
            workspaces: workspaces.clone(),
            provisioner: provisioner.clone(),
            verifier: verifier.clone(),
            tests: tests.clone(),
        };
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            steps,
            reporter.clone(),
            store.clone(),
            "https://api.github.com",
        ));

        Harness {
            orchestrator,
            workspaces,
            provisioner,
            verifier,
            tests,
            reporter,
            store,
        }
    }

    fn event() -> PushEvent {
        PushEvent {
            clone_url: "https://github.com/example/repo.git".to_string(),
            owner: "example".to_string(),
            repository: "repo".to_string(),
            commit: "abcd1234".to_string(),
        }
    }

    const STATUS_URL: &str = "https://api.github.com/repos/example/repo/statuses/abcd1234";

    #[tokio::test]
    async fn test_provisioning_failure_is_error_and_skips_checks() {
        let h = harness_with(
            FakeWorkspaceManager::succeeding(),
            FakeProvisioner::failing(),
            FakeVerifier::passing(),
            FakeTestRunner::passing("2 passed"),
        );

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Error);
        assert!(outcome.output.contains("virtual environment"));
        assert_eq!(h.provisioner.calls(), 1);
        assert_eq!(h.verifier.calls(), 0);
        assert_eq!(h.tests.calls(), 0);
        assert_eq!(
            h.reporter.calls(),
            vec![(STATUS_URL.to_string(), CommitState::Error)]
        );

        let records = h.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CommitState::Error);
        assert_eq!(records[0].test_output, outcome.output);
    }

    #[tokio::test]
    async fn test_all_checks_pass_is_success() {
        let h = harness(
            FakeWorkspaceManager::succeeding(),
            FakeVerifier::passing(),
            FakeTestRunner::passing("2 passed"),
        );

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Success);
        assert_eq!(
            h.reporter.calls(),
            vec![(STATUS_URL.to_string(), CommitState::Success)]
        );
        let records = h.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CommitState::Success);
        assert_eq!(records[0].commit_identifier, "abcd1234");
        assert_eq!(records[0].test_output, "2 passed");
    }

    #[tokio::test]
    async fn test_compile_failure_is_failure_even_if_tests_pass() {
        let h = harness(
            FakeWorkspaceManager::succeeding(),
            FakeVerifier::failing("SyntaxError: invalid syntax"),
            FakeTestRunner::passing("1 passed"),
        );

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Failure);
        assert_eq!(h.verifier.calls(), 1);
        assert_eq!(h.tests.calls(), 1, "tests must run despite compile failure");
        let record = &h.store.records()[0];
        assert_eq!(record.status, CommitState::Failure);
        assert!(record.test_output.contains("SyntaxError"));
        assert!(record.test_output.contains("1 passed"));
    }

    #[tokio::test]
    async fn test_failing_tests_is_failure() {
        let h = harness(
            FakeWorkspaceManager::succeeding(),
            FakeVerifier::passing(),
            FakeTestRunner::failing("1 failed, 1 passed"),
        );

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Failure);
        assert_eq!(
            h.reporter.calls(),
            vec![(STATUS_URL.to_string(), CommitState::Failure)]
        );
    }

    #[tokio::test]
    async fn test_clone_failure_is_error_and_skips_checks() {
        let h = harness(
            FakeWorkspaceManager::failing(),
            FakeVerifier::passing(),
            FakeTestRunner::passing(""),
        );

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Error);
        assert_eq!(h.workspaces.calls(), 1);
        assert_eq!(h.verifier.calls(), 0);
        assert_eq!(h.tests.calls(), 0);
        assert_eq!(
            h.reporter.calls(),
            vec![(STATUS_URL.to_string(), CommitState::Error)]
        );
        let records = h.store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, CommitState::Error);
    }

    #[tokio::test]
    async fn test_panicking_step_is_error() {
        let h = harness(
            FakeWorkspaceManager::succeeding(),
            FakeVerifier::panicking(),
            FakeTestRunner::passing(""),
        );

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Error);
        assert_eq!(h.store.records()[0].status, CommitState::Error);
        assert_eq!(h.reporter.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reporting_failure_still_persists() {
        let h = harness(
            FakeWorkspaceManager::succeeding(),
            FakeVerifier::passing(),
            FakeTestRunner::passing("ok"),
        );
        h.reporter.fail_transport(true);

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Success);
        assert_eq!(h.store.records()[0].status, CommitState::Success);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_change_outcome() {
        let h = harness(
            FakeWorkspaceManager::succeeding(),
            FakeVerifier::passing(),
            FakeTestRunner::passing("ok"),
        );
        h.store.fail_writes(true);

        let outcome = h.orchestrator.clone().run(event()).await;

        assert_eq!(outcome.state(), CommitState::Success);
        assert_eq!(
            h.reporter.calls(),
            vec![(STATUS_URL.to_string(), CommitState::Success)]
        );
    }

    #[tokio::test]
    async fn test_concurrent_runs_of_same_commit_are_serialized() {
        let h = harness(
            FakeWorkspaceManager::succeeding().with_delay_ms(20),
            FakeVerifier::passing(),
            FakeTestRunner::passing("ok"),
        );

        let first = tokio::spawn(h.orchestrator.clone().run(event()));
        let second = tokio::spawn(h.orchestrator.clone().run(event()));
        first.await.unwrap();
        second.await.unwrap();

        assert_eq!(h.workspaces.calls(), 2);
        assert_eq!(h.workspaces.peak_concurrency(), 1);
        assert_eq!(h.store.records().len(), 2);
    }

    #[test]
    fn test_output_includes_compile_diagnostics_on_failure() {
        let build = VerifyReport::fail("bad.py: invalid syntax\n");
        let tests = TestReport {
            passed: true,
            output: "1 passed".to_string(),
        };
        let output = combined_output(&build, &tests);
        assert!(output.starts_with("=== Compile check ===\nbad.py: invalid syntax\n"));
        assert!(output.ends_with("=== Tests ===\n1 passed"));

        let passed = VerifyReport::pass("");
        assert_eq!(combined_output(&passed, &tests), "1 passed");
    }
}
