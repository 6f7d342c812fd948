//! This module defines the `ContactRepository` and `ContactTransaction` traits,
//! which abstract the persistent contact table used by identity resolution.
use async_trait::async_trait;
use identity_shared::{Contact, ContactId, NewContact};

use crate::errors::ContactRepositoryError;

/// Name of a transaction-scoped exclusive lock.
///
/// Identity keys (`Email`, `Phone`) serialize requests that observe the same
/// value; `Cluster` keys serialize requests that touch the same cluster root
/// through different values. The derived ordering is the acquisition order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockKey {
    Email(String),
    Phone(String),
    Cluster(ContactId),
}

impl LockKey {
    /// Stable textual name of the lock, shared by every process using the store.
    pub fn lock_name(&self) -> String {
        match self {
            Self::Email(email) => format!("contact:email:{email}"),
            Self::Phone(phone) => format!("contact:phone:{phone}"),
            Self::Cluster(id) => format!("contact:cluster:{id}"),
        }
    }
}

/// Factory for scoped contact transactions.
///
/// Implementors are shared across requests and injected into the resolver as a
/// capability, so tests can swap the PostgreSQL store for the in-memory one.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Opens a new transaction.
    ///
    /// # Returns
    ///
    /// * `Ok(Box<dyn ContactTransaction>)` - A transaction that must be committed to persist its writes
    /// * `Err(ContactRepositoryError)` - If the store is unreachable or busy past its timeout
    async fn begin(&self) -> Result<Box<dyn ContactTransaction>, ContactRepositoryError>;
}

/// A unit of work against the contact table.
///
/// Reads observe the transaction's own writes. Nothing written is visible to
/// other transactions before `commit`; dropping the transaction without
/// committing discards every write and releases every lock.
#[async_trait]
pub trait ContactTransaction: Send {
    /// Acquires exclusive locks on the given keys, held until commit or rollback.
    ///
    /// Keys are deduplicated and taken in `LockKey` order. Locks already held by
    /// this transaction are re-entrant.
    async fn lock(&mut self, keys: &[LockKey]) -> Result<(), ContactRepositoryError>;

    /// Returns non-deleted contacts whose email equals `email` or whose phone
    /// number equals `phone_number`.
    ///
    /// A side of the OR whose input is `None` is skipped; with both `None` the
    /// result is empty.
    async fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Vec<Contact>, ContactRepositoryError>;

    /// Returns non-deleted contacts whose `id` or `linked_id` is in `ids`,
    /// ordered by `created_at` ascending and then by `id` ascending.
    async fn find_by_ids_or_linked_ids(
        &mut self,
        ids: &[ContactId],
    ) -> Result<Vec<Contact>, ContactRepositoryError>;

    /// Inserts a contact and returns it with its assigned id and timestamps.
    async fn create(&mut self, contact: NewContact) -> Result<Contact, ContactRepositoryError>;

    /// Turns every non-deleted contact in `ids` into a secondary of `linked_id`
    /// and refreshes its `updated_at`.
    ///
    /// # Returns
    ///
    /// The number of contacts updated. An empty `ids` slice is a no-op.
    async fn update_many_precedence(
        &mut self,
        ids: &[ContactId],
        linked_id: ContactId,
    ) -> Result<u64, ContactRepositoryError>;

    /// Makes every write of this transaction durable and releases its locks.
    async fn commit(self: Box<Self>) -> Result<(), ContactRepositoryError>;

    /// Discards every write of this transaction and releases its locks.
    async fn rollback(self: Box<Self>) -> Result<(), ContactRepositoryError>;
}
