//! In-memory fakes for the pipeline traits (testing only)
//!
//! Each fake records how it was called so tests can assert on the sequence
//! of pipeline steps without git, python or a network.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kiln_client::{ClientError, StatusReporter};
use kiln_core::domain::build::BuildRecord;
use kiln_core::domain::status::CommitState;

use crate::environment::{DependencyEnvironment, EnvironmentProvisioner};
use crate::error::{EnvironmentError, PipelineError, StoreError, WorkspaceError};
use crate::store::BuildStore;
use crate::test_runner::{TestReport, TestRunner};
use crate::verify::{BuildVerifier, VerifyReport};
use crate::workspace::{Workspace, WorkspaceManager};

// ---------------------------------------------------------------------------
// FakeWorkspaceManager
// ---------------------------------------------------------------------------

/// Workspace manager that never touches the filesystem
#[derive(Debug)]
pub struct FakeWorkspaceManager {
    succeed: bool,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeWorkspaceManager {
    fn new(succeed: bool) -> Self {
        Self {
            succeed,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(true)
    }

    /// Every materialization fails as if `git clone` exited non-zero
    pub fn failing() -> Self {
        Self::new(false)
    }

    /// Keeps each materialization in flight for `ms` milliseconds
    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of materializations that overlapped in time
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkspaceManager for FakeWorkspaceManager {
    async fn materialize(
        &self,
        clone_url: &str,
        commit: &str,
        repository: &str,
    ) -> Result<Workspace, WorkspaceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if !self.succeed {
            return Err(WorkspaceError::Clone {
                url: clone_url.to_string(),
                output: "fatal: repository not found".to_string(),
            });
        }

        Ok(Workspace {
            root: PathBuf::from("/fake/workspaces").join(format!("{}-{}", repository, commit)),
            commit: commit.to_string(),
            repository: repository.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// FakeProvisioner
// ---------------------------------------------------------------------------

/// Provisioner handing out environment paths without creating them
#[derive(Debug, Default)]
pub struct FakeProvisioner {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provisioning fails as if `python -m venv` exited non-zero
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnvironmentProvisioner for FakeProvisioner {
    async fn provision(
        &self,
        workspace: &Workspace,
    ) -> Result<DependencyEnvironment, EnvironmentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let env = DependencyEnvironment::for_workspace(workspace);
        if self.fail {
            return Err(EnvironmentError::Create {
                path: env.root,
                output: "Error: Command '-Im ensurepip' returned non-zero exit status 1".into(),
            });
        }
        Ok(env)
    }
}

// ---------------------------------------------------------------------------
// FakeVerifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Verdict {
    Pass,
    Fail(String),
    Panic,
}

/// Build verifier with a fixed verdict
#[derive(Debug)]
pub struct FakeVerifier {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl FakeVerifier {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn passing() -> Self {
        Self::new(Verdict::Pass)
    }

    pub fn failing(output: impl Into<String>) -> Self {
        Self::new(Verdict::Fail(output.into()))
    }

    /// Panics when called, standing in for an unexpected fault
    pub fn panicking() -> Self {
        Self::new(Verdict::Panic)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BuildVerifier for FakeVerifier {
    async fn verify(
        &self,
        _workspace: &Workspace,
        _env: &DependencyEnvironment,
    ) -> Result<VerifyReport, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.verdict {
            Verdict::Pass => Ok(VerifyReport::pass("")),
            Verdict::Fail(output) => Ok(VerifyReport::fail(output.clone())),
            Verdict::Panic => panic!("verifier exploded"),
        }
    }
}

// ---------------------------------------------------------------------------
// FakeTestRunner
// ---------------------------------------------------------------------------

/// Test runner returning a canned report
#[derive(Debug)]
pub struct FakeTestRunner {
    report: TestReport,
    calls: AtomicUsize,
}

impl FakeTestRunner {
    pub fn passing(output: impl Into<String>) -> Self {
        Self {
            report: TestReport {
                passed: true,
                output: output.into(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(output: impl Into<String>) -> Self {
        Self {
            report: TestReport {
                passed: false,
                output: output.into(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for FakeTestRunner {
    async fn run(
        &self,
        _workspace: &Workspace,
        _env: &DependencyEnvironment,
    ) -> Result<TestReport, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.report.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Status reporter that remembers every report in order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    calls: Mutex<Vec<(String, CommitState)>>,
    fail_transport: AtomicBool,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(status_url, state)` pairs
    pub fn calls(&self) -> Vec<(String, CommitState)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<CommitState> {
        self.calls().into_iter().map(|(_, state)| state).collect()
    }

    /// Makes every report fail after recording it
    pub fn fail_transport(&self, fail: bool) {
        self.fail_transport.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn report(&self, status_url: &str, state: CommitState) -> kiln_client::Result<u16> {
        self.calls
            .lock()
            .unwrap()
            .push((status_url.to_string(), state));

        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(ClientError::ParseError("simulated transport failure".into()));
        }
        Ok(201)
    }
}

// ---------------------------------------------------------------------------
// MemoryBuildStore
// ---------------------------------------------------------------------------

/// Build store backed by a `Vec`
#[derive(Debug, Default)]
pub struct MemoryBuildStore {
    records: Mutex<Vec<BuildRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryBuildStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<BuildRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Makes inserts and updates fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BuildStore for MemoryBuildStore {
    async fn insert(
        &self,
        commit_identifier: &str,
        build_date: chrono::DateTime<chrono::Utc>,
        status: CommitState,
        test_output: &str,
    ) -> Result<i64, StoreError> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        records.push(BuildRecord {
            id,
            commit_identifier: commit_identifier.to_string(),
            build_date,
            status,
            test_output: test_output.to_string(),
        });
        Ok(id)
    }

    async fn complete(
        &self,
        id: i64,
        status: CommitState,
        test_output: &str,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.status = status;
        record.test_output = test_output.to_string();
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<BuildRecord>, StoreError> {
        Ok(self.records())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<BuildRecord>, StoreError> {
        Ok(self.records().into_iter().find(|r| r.id == id))
    }
}
