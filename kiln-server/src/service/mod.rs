//! Service Module
//!
//! Business logic layer for the server.

pub mod build;
pub mod webhook;

// Re-export for convenience
pub use build as build_service;
pub use webhook as webhook_service;
