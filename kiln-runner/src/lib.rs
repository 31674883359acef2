//! Kiln Runner
//!
//! The build pipeline: everything that happens between an accepted push
//! notification and a persisted build record.
//!
//! Architecture:
//! - Workspace: clone and check out one commit into an isolated directory
//! - Environment: provision a per-workspace virtualenv and its dependencies
//! - Verify: batch compile check over every Python source file
//! - Test runner: run the pytest suite and capture its output
//! - Pipeline: sequence the steps, report commit status, persist the record
//!
//! Every step sits behind a trait so that the orchestrator can be driven by
//! the subprocess-backed implementations in production and by the in-memory
//! fakes (feature `fakes`) in tests.

pub mod config;
pub mod environment;
pub mod error;
pub mod locks;
pub mod pipeline;
pub mod process;
pub mod store;
pub mod test_runner;
pub mod verify;
pub mod workspace;

#[cfg(any(test, feature = "fakes"))]
pub mod fakes;

pub use config::PipelineConfig;
pub use environment::{DependencyEnvironment, EnvironmentProvisioner, VenvProvisioner};
pub use error::{EnvironmentError, PipelineError, ProcessError, StoreError, WorkspaceError};
pub use locks::CommitLocks;
pub use pipeline::PipelineOrchestrator;
pub use store::BuildStore;
pub use test_runner::{PytestRunner, TestReport, TestRunner};
pub use verify::{BuildVerifier, PyCompileVerifier, VerifyReport};
pub use workspace::{GitWorkspaceManager, Workspace, WorkspaceManager};
