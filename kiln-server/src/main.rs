use std::sync::Arc;

use anyhow::Context;
use kiln_client::GitHubStatusReporter;
use kiln_runner::{BuildStore, PipelineOrchestrator};
use kiln_runner::pipeline::PipelineSteps;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;

use crate::config::ServerConfig;
use crate::repository::build_repository::SqliteBuildStore;
use crate::service::webhook_service::WebhookDispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "kiln_server=debug,kiln_runner=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Kiln CI server...");

    let config = ServerConfig::from_env().context("Failed to load configuration")?;

    config
        .pipeline
        .check_tools()
        .await
        .context("Pipeline tools are missing")?;

    tracing::info!("Connecting to database...");

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!(
        "Workspaces under {}",
        config.pipeline.workspace_root.display()
    );

    let store: Arc<dyn BuildStore> = Arc::new(SqliteBuildStore::new(pool));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        PipelineSteps::standard(&config.pipeline),
        Arc::new(GitHubStatusReporter::new(
            config.github_token.clone(),
            config.status_context.clone(),
        )),
        Arc::clone(&store),
        config.pipeline.status_api_url.clone(),
    ));

    let state = api::AppState {
        store,
        dispatcher: Arc::new(WebhookDispatcher::new(orchestrator)),
    };

    // Build router with all API endpoints
    let app = api::create_router(state);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
