//! Pipeline error types
//!
//! Compile errors and failing tests are not errors: they are reported as
//! `passed: false` by the verifier and the test runner. The types here cover
//! the cases where the pipeline could not do its work at all, which the
//! orchestrator maps to the `error` commit state.

use std::path::PathBuf;

use thiserror::Error;

/// An external command could not be started
#[derive(Debug, Error)]
#[error("failed to run '{program}': {source}")]
pub struct ProcessError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

/// Workspace materialization failed
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove stale workspace {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git clone of {url} failed: {output}")]
    Clone { url: String, output: String },

    #[error("git checkout of {commit} failed: {output}")]
    Checkout { commit: String, output: String },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// The dependency environment could not be provisioned
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("failed to create virtual environment at {path}: {output}")]
    Create { path: PathBuf, output: String },

    #[error("failed to bootstrap pip: {output}")]
    Bootstrap { output: String },

    #[error("failed to install {package}: {output}")]
    ToolInstall { package: String, output: String },

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// Build record persistence failed
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("build {0} not found")]
    NotFound(i64),

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Any fault that stops a pipeline run before it reaches a verdict
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("environment error: {0}")]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pipeline task aborted: {0}")]
    Aborted(String),
}
