//! Kiln HTTP Clients
//!
//! Two small `reqwest` based clients live here:
//!
//! - [`KilnClient`] reads build history from a running Kiln server and is
//!   used by the CLI.
//! - [`GitHubStatusReporter`] posts commit statuses to the GitHub API and is
//!   used by the server and the pipeline.
//!
//! # Example
//!
//! ```no_run
//! use kiln_client::KilnClient;
//!
//! #[tokio::main]
//! async fn main() -> kiln_client::Result<()> {
//!     let client = KilnClient::new("http://localhost:8080");
//!
//!     for build in client.list_builds().await? {
//!         println!("#{} {} {}", build.id, build.commit_identifier, build.status);
//!     }
//!     Ok(())
//! }
//! ```

mod builds;
pub mod error;
pub mod status;

pub use error::{ClientError, Result};
pub use status::{GitHubStatusReporter, StatusReporter};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Kiln build history API
#[derive(Debug, Clone)]
pub struct KilnClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    client: Client,
}

impl KilnClient {
    /// Create a new client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a client with a preconfigured `reqwest::Client`
    ///
    /// Use this to set timeouts, proxies or TLS options.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the status code and deserialize a JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
