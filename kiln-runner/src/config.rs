//! Pipeline configuration
//!
//! Settings consumed by the pipeline components. Built once at startup by
//! the server and handed to constructors; nothing in the pipeline reads the
//! process environment on its own.

use std::path::PathBuf;

use crate::process;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory under which per-commit workspaces are created
    pub workspace_root: PathBuf,

    /// Interpreter used to create virtual environments (e.g., "python3")
    pub python: String,

    /// Git executable used for clone and checkout
    pub git: String,

    /// Base URL of the status API (e.g., "https://api.github.com")
    pub status_api_url: String,
}

impl PipelineConfig {
    /// Creates a new configuration with defaults for everything but the
    /// workspace root
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            python: "python3".to_string(),
            git: "git".to_string(),
            status_api_url: "https://api.github.com".to_string(),
        }
    }

    pub fn with_python(mut self, python: impl Into<String>) -> Self {
        self.python = python.into();
        self
    }

    pub fn with_status_api_url(mut self, url: impl Into<String>) -> Self {
        self.status_api_url = url.into();
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace_root.as_os_str().is_empty() {
            anyhow::bail!("workspace_root cannot be empty");
        }

        // Steps run with the workspace as cwd, so paths under it must be absolute
        if !self.workspace_root.is_absolute() {
            anyhow::bail!(
                "workspace_root must be an absolute path, got {}",
                self.workspace_root.display()
            );
        }

        if self.python.trim().is_empty() {
            anyhow::bail!("python cannot be empty");
        }

        if self.git.trim().is_empty() {
            anyhow::bail!("git cannot be empty");
        }

        if !self.status_api_url.starts_with("http://")
            && !self.status_api_url.starts_with("https://")
        {
            anyhow::bail!("status_api_url must start with http:// or https://");
        }

        Ok(())
    }
}

impl PipelineConfig {
    /// Checks that the configured git and python executables can be run
    pub async fn check_tools(&self) -> anyhow::Result<()> {
        for program in [&self.git, &self.python] {
            if !process::is_available(program).await {
                anyhow::bail!("'{} --version' failed. Is {} installed?", program, program);
            }
            tracing::info!("{} is available", program);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("kiln-workspaces"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.python, "python3");
        assert_eq!(config.git, "git");
        assert!(config.workspace_root.ends_with("kiln-workspaces"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PipelineConfig::default();

        config.python = String::new();
        assert!(config.validate().is_err());

        config.python = "python3".to_string();
        config.status_api_url = "api.github.com".to_string();
        assert!(config.validate().is_err());

        config = config.with_status_api_url("http://localhost:9000");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let mut config = PipelineConfig::default();
        config.git = "kiln-definitely-not-git".to_string();

        let err = config.check_tools().await.unwrap_err();

        assert!(err.to_string().contains("kiln-definitely-not-git"));
    }

    #[test]
    fn test_relative_workspace_root_is_rejected() {
        let config = PipelineConfig::new("ws");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("absolute"));

        let config = PipelineConfig::new(std::env::temp_dir().join("ws"));
        assert!(config.validate().is_ok());
    }
}
