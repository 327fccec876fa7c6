//! Shared service plumbing for TrashBack services.
//!
//! Configuration loading, health probes, HTTP middleware, serialization
//! helpers and tracing setup. Nothing in here knows about the rewards domain.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
