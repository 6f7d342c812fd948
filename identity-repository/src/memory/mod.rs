//! In-memory implementation of the contact repository.
//!
//! Used by the resolver tests and by the service when no `DATABASE_URL` is
//! configured. Transactions are fully serialized: each one owns the store's
//! mutex for its whole lifetime and works on a private copy of the rows that
//! is written back only on commit.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use identity_shared::{Contact, ContactId, LinkPrecedence, NewContact};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;
use tracing::debug;

use crate::config::StoreTimeouts;
use crate::errors::ContactRepositoryError;
use crate::interfaces::{ContactRepository, ContactTransaction, LockKey};

#[derive(Debug, Clone, Default)]
struct MemoryTable {
    rows: Vec<Contact>,
    last_id: ContactId,
}

impl MemoryTable {
    fn insert(&mut self, contact: NewContact, at: DateTime<Utc>) -> Contact {
        self.last_id += 1;
        let row = Contact {
            id: self.last_id,
            email: contact.email,
            phone_number: contact.phone_number,
            link_precedence: contact.link_precedence,
            linked_id: contact.linked_id,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        };
        self.rows.push(row.clone());
        row
    }

    fn live(&self) -> impl Iterator<Item = &Contact> {
        self.rows.iter().filter(|row| !row.is_deleted())
    }
}

fn sorted_by_creation(mut contacts: Vec<Contact>) -> Vec<Contact> {
    contacts.sort_by_key(Contact::creation_key);
    contacts
}

/// Contact repository held entirely in process memory.
///
/// Cloning the repository shares the underlying table.
#[derive(Clone)]
pub struct InMemoryContactRepository {
    table: Arc<Mutex<MemoryTable>>,
    failing_write: Arc<AtomicUsize>,
    timeouts: StoreTimeouts,
}

impl Default for InMemoryContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self::with_timeouts(StoreTimeouts::default())
    }

    /// Creates an empty repository. `timeouts.lock_timeout` bounds how long
    /// `begin` waits for a concurrent transaction to finish.
    pub fn with_timeouts(timeouts: StoreTimeouts) -> Self {
        Self {
            table: Arc::new(Mutex::new(MemoryTable::default())),
            failing_write: Arc::new(AtomicUsize::new(0)),
            timeouts,
        }
    }

    /// Inserts a committed contact with an explicit creation time.
    ///
    /// Lets fixtures build histories (equal timestamps, out-of-order ids,
    /// pre-existing clusters) that the resolver alone would never produce.
    pub async fn insert_at(&self, contact: NewContact, created_at: DateTime<Utc>) -> Contact {
        self.table.lock().await.insert(contact, created_at)
    }

    /// Marks a contact as soft-deleted. Returns `false` if the id is unknown.
    pub async fn soft_delete(&self, id: ContactId) -> bool {
        let mut table = self.table.lock().await;
        match table.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                let now = Utc::now();
                row.deleted_at = Some(now);
                row.updated_at = now;
                true
            }
            None => false,
        }
    }

    /// All committed rows, soft-deleted ones included, in id order.
    pub async fn snapshot(&self) -> Vec<Contact> {
        self.table.lock().await.rows.clone()
    }

    /// Number of committed rows, soft-deleted ones included.
    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Makes the next write operation of any transaction fail with a backend error.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_next_write(&self) {
        self.fail_nth_write(1);
    }

    /// Makes the `n`-th write operation from now fail with a backend error.
    /// `0` disarms a pending failure.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_nth_write(&self, n: usize) {
        self.failing_write.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn begin(&self) -> Result<Box<dyn ContactTransaction>, ContactRepositoryError> {
        let guard = timeout(self.timeouts.lock_timeout, self.table.clone().lock_owned())
            .await
            .map_err(|_| {
                ContactRepositoryError::timeout(format!(
                    "in-memory store busy for more than {}ms",
                    self.timeouts.lock_timeout.as_millis()
                ))
            })?;
        let working = (*guard).clone();

        Ok(Box::new(InMemoryContactTransaction {
            guard,
            working,
            failing_write: Arc::clone(&self.failing_write),
        }))
    }
}

/// Transaction over an `InMemoryContactRepository`.
pub struct InMemoryContactTransaction {
    guard: OwnedMutexGuard<MemoryTable>,
    working: MemoryTable,
    failing_write: Arc<AtomicUsize>,
}

impl InMemoryContactTransaction {
    fn check_write(&self) -> Result<(), ContactRepositoryError> {
        let countdown = self
            .failing_write
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if countdown == Ok(1) {
            return Err(ContactRepositoryError::backend("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ContactTransaction for InMemoryContactTransaction {
    async fn lock(&mut self, _keys: &[LockKey]) -> Result<(), ContactRepositoryError> {
        // The transaction already holds the whole table exclusively.
        Ok(())
    }

    async fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Vec<Contact>, ContactRepositoryError> {
        let matches = self
            .working
            .live()
            .filter(|row| {
                let email_hit = email.is_some() && row.email.as_deref() == email;
                let phone_hit =
                    phone_number.is_some() && row.phone_number.as_deref() == phone_number;
                email_hit || phone_hit
            })
            .cloned()
            .collect();

        Ok(sorted_by_creation(matches))
    }

    async fn find_by_ids_or_linked_ids(
        &mut self,
        ids: &[ContactId],
    ) -> Result<Vec<Contact>, ContactRepositoryError> {
        let matches = self
            .working
            .live()
            .filter(|row| {
                ids.contains(&row.id) || row.linked_id.is_some_and(|linked| ids.contains(&linked))
            })
            .cloned()
            .collect();

        Ok(sorted_by_creation(matches))
    }

    async fn create(&mut self, contact: NewContact) -> Result<Contact, ContactRepositoryError> {
        self.check_write()?;
        let created = self.working.insert(contact, Utc::now());
        debug!(
            contact_id = created.id,
            link_precedence = %created.link_precedence,
            "Contact created"
        );
        Ok(created)
    }

    async fn update_many_precedence(
        &mut self,
        ids: &[ContactId],
        linked_id: ContactId,
    ) -> Result<u64, ContactRepositoryError> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.check_write()?;

        let now = Utc::now();
        let mut updated = 0;
        for row in self.working.rows.iter_mut() {
            if !row.is_deleted() && ids.contains(&row.id) {
                row.link_precedence = LinkPrecedence::Secondary;
                row.linked_id = Some(linked_id);
                row.updated_at = now;
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn commit(self: Box<Self>) -> Result<(), ContactRepositoryError> {
        let InMemoryContactTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ContactRepositoryError> {
        Ok(())
    }
}
