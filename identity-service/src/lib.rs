//! # Identity Service
//!
//! HTTP shell around the identity resolver: reads configuration from the
//! environment, wires the contact store into an `IdentityResolver`, and
//! serves `POST /identify`.
//!
//! ## Modules
//!
//! - [`config`]: Environment configuration and dependency initialization
//! - [`server`]: Axum router, handlers and wire models
//! - [`errors`]: Error types for the service

pub mod config;
pub mod errors;
pub mod server;

pub use config::{Dependencies, ServiceConfig};
pub use errors::ServiceError;
