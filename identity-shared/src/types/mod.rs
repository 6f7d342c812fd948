//! This module defines the core data structures and types used across the identity service.
//! It re-exports the contact record types and the cluster view.

pub mod cluster_view;
pub mod contact;

pub use cluster_view::ClusterView;
pub use contact::{Contact, ContactId, LinkPrecedence, NewContact, ParseLinkPrecedenceError};
