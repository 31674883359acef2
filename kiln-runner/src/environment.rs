//! Dependency environment provisioning
//!
//! Each workspace gets its own virtualenv at `<workspace>/.venv`. The
//! environment is created on first use and reused by later phases of the
//! same run. Installing the project's `requirements.txt` is best-effort: a
//! broken manifest is logged and the pipeline carries on, letting the
//! compile check or the tests fail with a more specific signal.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::EnvironmentError;
use crate::process;
use crate::workspace::Workspace;

/// Directory of the virtualenv inside a workspace
pub const VENV_DIR: &str = ".venv";

/// Dependency manifest looked up at the workspace root
pub const MANIFEST: &str = "requirements.txt";

/// Handle to a provisioned virtualenv
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEnvironment {
    pub root: PathBuf,
    /// Interpreter inside the environment
    pub python: PathBuf,
}

impl DependencyEnvironment {
    /// Location of the environment for `workspace`, whether or not it exists
    pub fn for_workspace(workspace: &Workspace) -> Self {
        let root = workspace.root.join(VENV_DIR);
        let python = if cfg!(windows) {
            root.join("Scripts").join("python.exe")
        } else {
            root.join("bin").join("python")
        };
        Self { root, python }
    }

    pub fn exists(&self) -> bool {
        self.python.exists()
    }

    /// `python -m <module> <args>` inside this environment
    pub fn module(&self, module: &str) -> Command {
        let mut command = Command::new(&self.python);
        command.arg("-m").arg(module);
        command
    }
}

/// Creates isolated runtime environments inside workspaces
#[async_trait]
pub trait EnvironmentProvisioner: Send + Sync {
    /// Ensures the environment for `workspace` exists, has a package
    /// installer, and has the manifest dependencies installed
    ///
    /// Safe to call more than once per workspace.
    async fn provision(&self, workspace: &Workspace)
    -> Result<DependencyEnvironment, EnvironmentError>;
}

/// `EnvironmentProvisioner` backed by `python -m venv` and pip
#[derive(Debug, Clone)]
pub struct VenvProvisioner {
    python: String,
}

impl VenvProvisioner {
    /// # Arguments
    /// * `python` - Interpreter used to create new environments
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }

    async fn ensure_pip(&self, env: &DependencyEnvironment) -> Result<(), EnvironmentError> {
        let check = process::run(env.module("pip").arg("--version")).await?;
        if check.success() {
            return Ok(());
        }

        info!("Bootstrapping pip in {}", env.root.display());
        let bootstrap = process::run(env.module("ensurepip").arg("--upgrade")).await?;
        if !bootstrap.success() {
            return Err(EnvironmentError::Bootstrap {
                output: bootstrap.combined().trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl EnvironmentProvisioner for VenvProvisioner {
    async fn provision(
        &self,
        workspace: &Workspace,
    ) -> Result<DependencyEnvironment, EnvironmentError> {
        let env = DependencyEnvironment::for_workspace(workspace);

        if env.exists() {
            debug!("Reusing environment at {}", env.root.display());
        } else {
            info!("Creating environment at {}", env.root.display());
            let created =
                process::run(Command::new(&self.python).arg("-m").arg("venv").arg(&env.root))
                    .await?;

            if !created.success() {
                return Err(EnvironmentError::Create {
                    path: env.root.clone(),
                    output: created.combined().trim().to_string(),
                });
            }
        }

        self.ensure_pip(&env).await?;
        install_requirements(workspace, &env).await?;

        Ok(env)
    }
}

/// Installs the workspace manifest into `env`, if there is one
///
/// # Returns
/// `false` when a manifest exists and pip failed to install it. The failure
/// is logged and never turned into an error.
pub async fn install_requirements(
    workspace: &Workspace,
    env: &DependencyEnvironment,
) -> Result<bool, EnvironmentError> {
    let manifest = workspace.root.join(MANIFEST);
    if !manifest.is_file() {
        debug!("No {} in {}", MANIFEST, workspace.root.display());
        return Ok(true);
    }

    info!("Installing dependencies from {}", manifest.display());
    let install = process::run(
        env.module("pip")
            .arg("install")
            .arg("--disable-pip-version-check")
            .arg("-r")
            .arg(&manifest)
            .current_dir(&workspace.root),
    )
    .await?;

    if !install.success() {
        warn!(
            "Dependency installation failed for {} (continuing): {}",
            workspace.root.display(),
            install.combined().trim()
        );
        return Ok(false);
    }

    Ok(true)
}
