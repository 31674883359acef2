//! Configuration module

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Kiln server
    pub server_url: String,
}
