//! PostgreSQL implementation of the contact repository.
mod contact_repository;

pub use contact_repository::{PostgresContactRepository, PostgresContactTransaction};
