//! Server configuration
//!
//! Everything the server reads from the process environment, gathered once
//! at startup.

use std::path::PathBuf;

use anyhow::Context;
use kiln_runner::PipelineConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://kiln.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_STATUS_CONTEXT: &str = "kiln-ci";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Token sent as bearer credentials with every status report
    pub github_token: String,

    /// SQLite connection string (e.g., "sqlite://kiln.db")
    pub database_url: String,

    /// Socket address the HTTP server binds to
    pub bind_addr: String,

    /// Label commit statuses are reported under
    pub status_context: String,

    /// Settings handed to the pipeline
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - GITHUB_TOKEN (required)
    /// - DATABASE_URL (optional, default: sqlite://kiln.db)
    /// - KILN_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - KILN_WORKSPACE_ROOT (optional, default: <tmp>/kiln-workspaces)
    /// - KILN_PYTHON (optional, default: python3)
    /// - GITHUB_API_URL (optional, default: https://api.github.com)
    /// - KILN_STATUS_CONTEXT (optional, default: kiln-ci)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with variables looked up
    /// through `lookup`
    pub fn from_vars<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let github_token = lookup("GITHUB_TOKEN")
            .context("GITHUB_TOKEN environment variable not set")?;

        let mut pipeline = match lookup("KILN_WORKSPACE_ROOT") {
            Some(root) => {
                let root = std::path::absolute(PathBuf::from(&root))
                    .with_context(|| format!("invalid KILN_WORKSPACE_ROOT '{}'", root))?;
                PipelineConfig::new(root)
            }
            None => PipelineConfig::default(),
        };
        if let Some(python) = lookup("KILN_PYTHON") {
            pipeline = pipeline.with_python(python);
        }
        if let Some(api_url) = lookup("GITHUB_API_URL") {
            pipeline = pipeline.with_status_api_url(api_url.trim_end_matches('/'));
        }

        let config = Self {
            github_token,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: lookup("KILN_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            status_context: lookup("KILN_STATUS_CONTEXT")
                .unwrap_or_else(|| DEFAULT_STATUS_CONTEXT.to_string()),
            pipeline,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.github_token.trim().is_empty() {
            anyhow::bail!("GITHUB_TOKEN cannot be empty");
        }

        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL cannot be empty");
        }

        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("KILN_BIND_ADDR cannot be empty");
        }

        if self.status_context.trim().is_empty() {
            anyhow::bail!("KILN_STATUS_CONTEXT cannot be empty");
        }

        self.pipeline
            .validate()
            .context("invalid pipeline configuration")
    }
}
