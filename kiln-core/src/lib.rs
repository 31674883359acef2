//! Kiln Core
//!
//! Core types shared by the Kiln CI services.
//!
//! This crate contains:
//! - Domain types: push events, build records, commit states
//! - DTOs: webhook payloads, status requests and API messages

pub mod domain;
pub mod dto;
