//! API Module
//!
//! HTTP API layer for the CI server.
//! Each submodule handles endpoints for a specific concern.

pub mod build;
pub mod error;
pub mod health;
pub mod webhook;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use kiln_runner::BuildStore;
use tower_http::trace::TraceLayer;

use crate::service::webhook_service::WebhookDispatcher;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BuildStore>,
    pub dispatcher: Arc<WebhookDispatcher>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // GitHub deliveries
        .route("/webhook", post(webhook::receive_webhook))
        // Build history
        .route("/builds", get(build::list_builds))
        .route("/builds/{id}", get(build::get_build))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
