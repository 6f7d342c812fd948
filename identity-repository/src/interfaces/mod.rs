//! This module defines and re-exports the interfaces for the contact store.
//! It serves as a central point for accessing traits related to data interaction.
mod contact_repository;

pub use contact_repository::{ContactRepository, ContactTransaction, LockKey};
