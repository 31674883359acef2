//! Repository Module
//!
//! Data access layer for the server.

pub mod build;

// Re-export for convenience
pub use build as build_repository;
