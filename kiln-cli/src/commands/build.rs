//! Build command handlers
//!
//! Lists recorded builds and shows a single build with its output.

use anyhow::{Result, bail};
use clap::Subcommand;
use colored::*;
use kiln_client::KilnClient;
use kiln_core::domain::build::BuildRecord;
use kiln_core::domain::status::CommitState;

use crate::config::Config;

/// Build subcommands
#[derive(Subcommand)]
pub enum BuildCommands {
    /// List all builds
    List,
    /// Get build details, including the captured output
    Get {
        /// Build record ID
        id: i64,
    },
}

/// Handle build commands
pub async fn handle_build_command(command: BuildCommands, config: &Config) -> Result<()> {
    let client = KilnClient::new(&config.server_url);

    match command {
        BuildCommands::List => list_builds(&client).await,
        BuildCommands::Get { id } => get_build(&client, id).await,
    }
}

async fn list_builds(client: &KilnClient) -> Result<()> {
    let builds = client.list_builds().await?;

    if builds.is_empty() {
        println!("{}", "No builds found.".yellow());
    } else {
        println!("{}", format!("Found {} build(s):", builds.len()).bold());
        println!();
        for build in builds {
            print_build_summary(&build);
        }
    }

    Ok(())
}

async fn get_build(client: &KilnClient, id: i64) -> Result<()> {
    let build = match client.get_build(id).await {
        Ok(build) => build,
        Err(e) if e.is_not_found() => bail!("Build {} not found", id),
        Err(e) => return Err(e.into()),
    };

    print_build_details(&build);

    Ok(())
}

fn print_build_summary(build: &BuildRecord) {
    println!(
        "  {} {}  {}  {}",
        format!("#{}", build.id).cyan(),
        colorize_status(build.status),
        short_commit(&build.commit_identifier),
        build
            .build_date
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
}

fn print_build_details(build: &BuildRecord) {
    println!("{}", "Build Details:".bold());
    println!("  ID:      {}", build.id.to_string().cyan());
    println!("  Commit:  {}", build.commit_identifier);
    println!("  Status:  {}", colorize_status(build.status));
    println!("  Date:    {}", build.build_date.format("%Y-%m-%d %H:%M:%S"));

    println!("\n{}", "Output:".bold());
    println!("{}", "─".repeat(80).dimmed());
    if build.test_output.is_empty() {
        println!("{}", "(no output)".dimmed());
    } else {
        println!("{}", build.test_output.trim_end());
    }
    println!("{}", "─".repeat(80).dimmed());
}

fn colorize_status(status: CommitState) -> ColoredString {
    let status_str = status.as_str();
    match status {
        CommitState::Pending => status_str.yellow(),
        CommitState::Success => status_str.green(),
        CommitState::Failure => status_str.red(),
        CommitState::Error => status_str.magenta(),
    }
}

/// First 12 characters of a commit hash
fn short_commit(commit: &str) -> &str {
    commit.get(..12).unwrap_or(commit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_commit() {
        assert_eq!(
            short_commit("abcdef0123456789abcdef0123456789abcdef01"),
            "abcdef012345"
        );
        assert_eq!(short_commit("abc123"), "abc123");
    }

    #[test]
    fn test_status_text_is_kept() {
        colored::control::set_override(false);
        assert_eq!(colorize_status(CommitState::Failure).to_string(), "failure");
        assert_eq!(colorize_status(CommitState::Success).to_string(), "success");
    }
}
