//! # Identity Repository
//!
//! This crate provides the record store behind identity resolution: the
//! `ContactRepository` and `ContactTransaction` traits, their error type, and
//! two implementations, one backed by PostgreSQL and one held in memory.
//!
//! Every read and write of a resolution request happens inside one
//! `ContactTransaction`, which also owns the transaction-scoped locks that keep
//! concurrent requests for overlapping identities from interleaving.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod postgres;

pub use config::{RepositoryConfig, StoreTimeouts};
pub use errors::ContactRepositoryError;
pub use interfaces::{ContactRepository, ContactTransaction, LockKey};
pub use memory::InMemoryContactRepository;
pub use postgres::PostgresContactRepository;
