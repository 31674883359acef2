//! Test execution
//!
//! Runs the project's pytest suite once inside the workspace environment and
//! captures everything it prints. Pass/fail is the exit status of pytest;
//! there is no per-test bookkeeping and no retry.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::environment::{self, DependencyEnvironment, EnvironmentProvisioner};
use crate::error::{EnvironmentError, PipelineError};
use crate::process;
use crate::workspace::Workspace;

/// Package providing the test runner
pub const TEST_TOOL: &str = "pytest";

/// Result of a test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestReport {
    pub passed: bool,
    /// Combined standard output and error of the test run
    pub output: String,
}

/// Runs a workspace's test suite
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(
        &self,
        workspace: &Workspace,
        env: &DependencyEnvironment,
    ) -> Result<TestReport, PipelineError>;
}

/// `TestRunner` invoking `python -m pytest`
pub struct PytestRunner {
    provisioner: Arc<dyn EnvironmentProvisioner>,
}

impl PytestRunner {
    /// # Arguments
    /// * `provisioner` - Used to create the environment when it is missing
    pub fn new(provisioner: Arc<dyn EnvironmentProvisioner>) -> Self {
        Self { provisioner }
    }

    /// Installs pytest into `env` unless it is already importable
    async fn ensure_test_tool(&self, env: &DependencyEnvironment) -> Result<(), EnvironmentError> {
        let check = process::run(env.module(TEST_TOOL).arg("--version")).await?;
        if check.success() {
            return Ok(());
        }

        info!("Installing {} into {}", TEST_TOOL, env.root.display());
        let install = process::run(
            env.module("pip")
                .arg("install")
                .arg("--disable-pip-version-check")
                .arg(TEST_TOOL),
        )
        .await?;

        if !install.success() {
            return Err(EnvironmentError::ToolInstall {
                package: TEST_TOOL.to_string(),
                output: install.combined().trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl TestRunner for PytestRunner {
    async fn run(
        &self,
        workspace: &Workspace,
        env: &DependencyEnvironment,
    ) -> Result<TestReport, PipelineError> {
        if !workspace.root.is_dir() {
            return Ok(TestReport {
                passed: false,
                output: format!(
                    "Cannot run tests: {} does not exist",
                    workspace.root.display()
                ),
            });
        }

        let env = if env.exists() {
            environment::install_requirements(workspace, env).await?;
            env.clone()
        } else {
            debug!("Environment missing, provisioning before tests");
            self.provisioner.provision(workspace).await?
        };

        self.ensure_test_tool(&env).await?;

        info!("Running test suite in {}", workspace.root.display());
        let output = process::run(env.module(TEST_TOOL).arg("-v").current_dir(&workspace.root))
            .await?;

        info!(
            "Test suite in {} finished with exit code {}",
            workspace.root.display(),
            output.exit_code
        );

        Ok(TestReport {
            passed: output.success(),
            output: output.combined(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VenvProvisioner;
    use std::path::Path;
    use std::process::Command as StdCommand;

    // pytest has to come from a package index when it is not preinstalled,
    // so these tests only run where the system interpreter already has it
    fn pytest_available() -> bool {
        let scratch = tempfile::tempdir().unwrap();
        let succeeds = |command: &mut StdCommand| {
            command
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        };
        succeeds(StdCommand::new("python3").args(["-m", "pytest", "--version"]))
            && succeeds(
                StdCommand::new("python3")
                    .arg("-m")
                    .arg("venv")
                    .arg(scratch.path().join("scratch")),
            )
    }

    /// Environment that reuses the system interpreter, through a venv that
    /// sees system site-packages
    fn system_environment(dir: &Path) -> DependencyEnvironment {
        let root = dir.join(environment::VENV_DIR);
        let status = StdCommand::new("python3")
            .arg("-m")
            .arg("venv")
            .arg("--system-site-packages")
            .arg(&root)
            .status()
            .unwrap();
        assert!(status.success());
        DependencyEnvironment::for_workspace(&workspace(dir))
    }

    fn workspace(dir: &Path) -> Workspace {
        Workspace {
            root: dir.to_path_buf(),
            commit: "abcd1234".to_string(),
            repository: "repo".to_string(),
        }
    }

    fn runner() -> PytestRunner {
        PytestRunner::new(Arc::new(VenvProvisioner::new("python3")))
    }

    #[tokio::test]
    async fn test_missing_workspace_fails_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let ws = workspace(&dir.path().join("gone"));
        let env = DependencyEnvironment::for_workspace(&ws);

        let report = runner().run(&ws, &env).await.unwrap();

        assert!(!report.passed);
        assert!(report.output.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_passing_suite() {
        if !pytest_available() {
            eprintln!("pytest not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("test_math.py"),
            "def test_addition():\n    assert 1 + 1 == 2\n",
        )
        .unwrap();
        let env = system_environment(dir.path());

        let report = runner().run(&workspace(dir.path()), &env).await.unwrap();

        assert!(report.passed, "{}", report.output);
        assert!(report.output.contains("test_addition"));
    }

    #[tokio::test]
    async fn test_one_failing_test_fails_the_run() {
        if !pytest_available() {
            eprintln!("pytest not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("test_mixed.py"),
            "def test_passes():\n    assert True\n\n\
             def test_fails():\n    assert 2 + 2 == 5, 'arithmetic is broken'\n",
        )
        .unwrap();
        let env = system_environment(dir.path());

        let report = runner().run(&workspace(dir.path()), &env).await.unwrap();

        assert!(!report.passed);
        assert!(report.output.contains("test_passes"), "{}", report.output);
        assert!(report.output.contains("test_fails"), "{}", report.output);
        assert!(report.output.contains("arithmetic is broken"), "{}", report.output);
    }
}
