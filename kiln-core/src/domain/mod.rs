//! Core domain types
//!
//! These types represent the entities that flow through the build pipeline
//! and are shared between the server (persistence, HTTP) and the runner
//! (execution).

pub mod build;
pub mod push;
pub mod status;
