//! Kiln CLI
//!
//! Command-line interface for browsing the Kiln CI build history.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "kiln")]
#[command(about = "Kiln CI build history CLI", long_about = None)]
struct Cli {
    /// Kiln server URL
    #[arg(long, env = "KILN_SERVER_URL", default_value = "http://localhost:8080")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url.trim_end_matches('/').to_string(),
    };

    handle_command(cli.command, &config).await
}
