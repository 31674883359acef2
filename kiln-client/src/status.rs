//! Commit status reporting
//!
//! Sends one status notification per call to the GitHub statuses API. There
//! is no batching and no retry; a failed report is returned to the caller,
//! which only logs it. The outcome of a pipeline run never depends on
//! whether its status report went through.

use async_trait::async_trait;
use kiln_core::domain::status::CommitState;
use kiln_core::dto::status::StatusRequest;
use reqwest::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::debug;

use crate::error::Result;

/// Reports commit states to the source-control host
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Posts `state` to `status_url`
    ///
    /// # Returns
    /// The raw HTTP status code of the remote response, for logging. Non-2xx
    /// codes are returned as values; only transport failures are errors.
    async fn report(&self, status_url: &str, state: CommitState) -> Result<u16>;
}

/// `StatusReporter` backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubStatusReporter {
    client: Client,
    token: String,
    context: String,
}

impl GitHubStatusReporter {
    /// # Arguments
    /// * `token` - Credential sent as a bearer token
    /// * `context` - Label GitHub shows next to the status (e.g. "kiln-ci")
    pub fn new(token: impl Into<String>, context: impl Into<String>) -> Self {
        Self::with_client(Client::new(), token, context)
    }

    pub fn with_client(client: Client, token: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            context: context.into(),
        }
    }
}

#[async_trait]
impl StatusReporter for GitHubStatusReporter {
    async fn report(&self, status_url: &str, state: CommitState) -> Result<u16> {
        debug!("Reporting '{}' to {}", state, status_url);

        let response = self
            .client
            .post(status_url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "kiln-ci")
            .json(&StatusRequest::new(state, self.context.as_str()))
            .send()
            .await?;

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn capture(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        captured.lock().unwrap().push((auth, body));
        StatusCode::CREATED
    }

    #[tokio::test]
    async fn test_report_posts_state_with_bearer_token() {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route("/repos/{owner}/{repo}/statuses/{sha}", post(capture))
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let reporter = GitHubStatusReporter::new("secret", "kiln-ci");
        let url = format!("http://{}/repos/example/repo/statuses/abcd1234", addr);
        let code = reporter.report(&url, CommitState::Success).await.unwrap();

        assert_eq!(code, 201);
        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].0.as_deref(), Some("Bearer secret"));
        assert_eq!(captured[0].1["state"], "success");
        assert_eq!(captured[0].1["context"], "kiln-ci");
    }

    #[tokio::test]
    async fn test_report_transport_failure_is_error() {
        // Nothing listens on port 9 of the loopback interface
        let reporter = GitHubStatusReporter::new("secret", "kiln-ci");
        let result = reporter
            .report("http://127.0.0.1:9/repos/a/b/statuses/c", CommitState::Error)
            .await;
        assert!(result.is_err());
    }
}
