//! Data Transfer Objects
//!
//! Wire shapes exchanged with GitHub and between Kiln services. DTOs are
//! kept separate from domain types so that the payload layout can follow
//! the remote contract without leaking into the pipeline.

pub mod api;
pub mod status;
pub mod webhook;
