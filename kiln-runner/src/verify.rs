//! Build verification
//!
//! Static compile check of a workspace: every `.py` file below the root is
//! byte-compiled in a single `py_compile` invocation. One bad file fails the
//! whole batch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::environment::{DependencyEnvironment, VENV_DIR};
use crate::error::PipelineError;
use crate::process;
use crate::workspace::Workspace;

/// Extension of the files that are compile-checked
pub const SOURCE_EXTENSION: &str = "py";

/// Result of a compile check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub passed: bool,
    pub output: String,
}

impl VerifyReport {
    pub fn pass(output: impl Into<String>) -> Self {
        Self {
            passed: true,
            output: output.into(),
        }
    }

    pub fn fail(output: impl Into<String>) -> Self {
        Self {
            passed: false,
            output: output.into(),
        }
    }
}

/// Compile-checks the sources of a workspace
#[async_trait]
pub trait BuildVerifier: Send + Sync {
    async fn verify(
        &self,
        workspace: &Workspace,
        env: &DependencyEnvironment,
    ) -> Result<VerifyReport, PipelineError>;
}

/// `BuildVerifier` running `python -m py_compile` inside the environment
#[derive(Debug, Clone, Default)]
pub struct PyCompileVerifier;

impl PyCompileVerifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BuildVerifier for PyCompileVerifier {
    async fn verify(
        &self,
        workspace: &Workspace,
        env: &DependencyEnvironment,
    ) -> Result<VerifyReport, PipelineError> {
        check_path(&workspace.root, env).await
    }
}

/// Compile-checks `path`
///
/// - a missing path fails
/// - a single file fails, a project directory is expected
/// - an empty directory, or one without sources, passes
/// - otherwise all sources are checked in one batch
pub async fn check_path(
    path: &Path,
    env: &DependencyEnvironment,
) -> Result<VerifyReport, PipelineError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(VerifyReport::fail(format!(
                "{} does not exist",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_dir() {
        return Ok(VerifyReport::fail(format!(
            "{} is not a project directory",
            path.display()
        )));
    }

    let files = collect_sources(path.to_path_buf()).await?;
    if files.is_empty() {
        debug!("No sources under {}, nothing to check", path.display());
        return Ok(VerifyReport::pass(""));
    }

    info!("Compile-checking {} file(s) under {}", files.len(), path.display());

    let mut command = env.module("py_compile");
    command.args(&files).current_dir(path);
    let output = process::run(&mut command).await?;

    if output.success() {
        Ok(VerifyReport::pass(output.combined()))
    } else {
        info!("Compile check failed for {}", path.display());
        Ok(VerifyReport::fail(output.combined()))
    }
}

/// Recursively collects source files under `dir`, sorted
///
/// The workspace's own virtualenv and git metadata are not project sources.
/// The walk runs on the blocking pool.
async fn collect_sources(dir: PathBuf) -> Result<Vec<PathBuf>, PipelineError> {
    let files = tokio::task::spawn_blocking(move || {
        let mut files = Vec::new();
        walk(&dir, &mut files)?;
        files.sort();
        Ok::<_, std::io::Error>(files)
    })
    .await
    .map_err(|e| PipelineError::Aborted(e.to_string()))??;

    Ok(files)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            let name = entry.file_name();
            if name == VENV_DIR || name == ".git" {
                continue;
            }
            walk(&path, files)?;
        } else if path
            .extension()
            .map(|ext| ext == SOURCE_EXTENSION)
            .unwrap_or(false)
        {
            files.push(path);
        }
    }
    Ok(())
}
