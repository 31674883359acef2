//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod build;

pub use build::BuildCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build history
    Build {
        #[command(subcommand)]
        command: BuildCommands,
    },
}

/// Handle a CLI command
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Build { command } => build::handle_build_command(command, config).await,
    }
}
