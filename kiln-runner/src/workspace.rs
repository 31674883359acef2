//! Workspace management
//!
//! A workspace is a disposable directory holding the checked-out source of
//! one commit. Its path is derived from `(repository, commit)`, so repeated
//! deliveries of the same commit land in the same slot; whatever occupies
//! the slot is removed before cloning again.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::WorkspaceError;
use crate::process;

/// A checked-out commit on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
    pub commit: String,
    pub repository: String,
}

/// Materializes clean source trees for commits
#[async_trait]
pub trait WorkspaceManager: Send + Sync {
    /// Clones `clone_url` and checks out `commit` into a fresh workspace
    ///
    /// There is a single clone attempt. Any failure is terminal for the
    /// calling pipeline run.
    async fn materialize(
        &self,
        clone_url: &str,
        commit: &str,
        repository: &str,
    ) -> Result<Workspace, WorkspaceError>;
}

/// `WorkspaceManager` backed by the git command line
#[derive(Debug, Clone)]
pub struct GitWorkspaceManager {
    root: PathBuf,
    git: String,
}

impl GitWorkspaceManager {
    /// # Arguments
    /// * `root` - Directory holding all workspaces
    /// * `git` - Git executable
    pub fn new(root: impl Into<PathBuf>, git: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            git: git.into(),
        }
    }

    /// Slot for a `(repository, commit)` pair
    pub fn workspace_path(&self, repository: &str, commit: &str) -> PathBuf {
        self.root.join(format!("{}-{}", repository, commit))
    }

    async fn clear_slot(&self, path: &Path) -> Result<(), WorkspaceError> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(WorkspaceError::Cleanup {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        info!("Removing stale workspace {}", path.display());

        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };

        removed.map_err(|source| WorkspaceError::Cleanup {
            path: path.to_path_buf(),
            source,
        })
    }

    fn git(&self) -> Command {
        let mut command = Command::new(&self.git);
        // Fail instead of waiting for credentials on private repositories
        command.env("GIT_TERMINAL_PROMPT", "0");
        command
    }
}

#[async_trait]
impl WorkspaceManager for GitWorkspaceManager {
    async fn materialize(
        &self,
        clone_url: &str,
        commit: &str,
        repository: &str,
    ) -> Result<Workspace, WorkspaceError> {
        let path = self.workspace_path(repository, commit);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::CreateRoot {
                path: self.root.clone(),
                source,
            })?;

        self.clear_slot(&path).await?;

        info!("Cloning {} into {}", clone_url, path.display());

        let clone = process::run(
            self.git()
                .arg("clone")
                .arg("--quiet")
                .arg(clone_url)
                .arg(&path),
        )
        .await?;

        if !clone.success() {
            return Err(WorkspaceError::Clone {
                url: clone_url.to_string(),
                output: clone.combined().trim().to_string(),
            });
        }

        // The pushed commit is not necessarily the tip of the default branch
        let checkout = process::run(
            self.git()
                .arg("-C")
                .arg(&path)
                .arg("checkout")
                .arg("--quiet")
                .arg("--detach")
                .arg(commit),
        )
        .await?;

        if !checkout.success() {
            return Err(WorkspaceError::Checkout {
                commit: commit.to_string(),
                output: checkout.combined().trim().to_string(),
            });
        }

        debug!("Workspace ready at {}", path.display());

        Ok(Workspace {
            root: path,
            commit: commit.to_string(),
            repository: repository.to_string(),
        })
    }
}
