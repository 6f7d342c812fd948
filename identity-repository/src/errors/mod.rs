//! Error types for the identity repository.
//! Consolidates and re-exports error types related to contact store operations.
mod contact_repository;

pub use contact_repository::ContactRepositoryError;
