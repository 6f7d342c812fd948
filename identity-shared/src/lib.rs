//! # Identity Shared
//!
//! This crate defines shared data structures and types used across the identity
//! reconciliation workspace. It includes the stored contact record, its link
//! precedence, the insert payload and the consolidated cluster view returned to callers.

pub mod types;

pub use types::cluster_view::ClusterView;
pub use types::contact::{Contact, ContactId, LinkPrecedence, NewContact, ParseLinkPrecedenceError};
