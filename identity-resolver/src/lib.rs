//! # Identity Resolver
//!
//! Resolves an observation (an email and/or a phone number) to the identity
//! cluster it belongs to, merging clusters that turn out to be the same
//! identity, and returns the consolidated view of that identity.
//!
//! ## Architecture
//!
//! One resolution runs inside one store transaction and flows through:
//!
//! 1. **Resolver**: finds the clusters the observation touches
//! 2. **Merge**: collapses several clusters under the oldest root
//! 3. **Ingestor**: records the observation when it carries new values
//! 4. **View**: builds the de-duplicated cluster view
//!
//! ## Modules
//!
//! - [`config`]: Pipeline settings
//! - [`errors`]: Error types for the pipeline
//! - [`input`]: Request normalization and validation
//! - [`resolver`]: Cluster lookup under transaction-scoped locks
//! - [`merge`]: True primary selection and demotion
//! - [`ingestor`]: New-information detection and record creation
//! - [`view`]: Consolidated view assembly
//! - [`service`]: The `IdentityResolver` entry point

pub mod config;
pub mod errors;
pub mod ingestor;
pub mod input;
pub mod merge;
pub mod resolver;
pub mod service;
pub mod view;

pub use config::ResolverConfig;
pub use errors::ResolveError;
pub use input::IdentityQuery;
pub use service::IdentityResolver;
