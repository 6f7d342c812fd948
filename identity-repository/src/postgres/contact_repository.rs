//! PostgreSQL implementation of the contact repository.
//!
//! Provides a PostgreSQL backend for the `ContactRepository` trait with
//! connection pooling, bounded waits and transaction-scoped advisory locks.
//!
//! ## Key Features
//!
//! - Connection pooling with `sqlx::PgPool`
//! - One `sqlx::Transaction` per resolution, rolled back on drop
//! - `statement_timeout` and `lock_timeout` set per transaction
//! - `pg_advisory_xact_lock` for identity and cluster locks
//!
//! ## Database Tables
//!
//! - `contact`: identity observations, soft-deleted through `deleted_at`
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use identity_shared::{Contact, ContactId, NewContact};
use sqlx::postgres::PgPoolOptions;
use tracing::{debug, info};

use crate::config::{RepositoryConfig, StoreTimeouts};
use crate::errors::ContactRepositoryError;
use crate::interfaces::{ContactRepository, ContactTransaction, LockKey};

const CONTACT_COLUMNS: &str =
    "id, email, phone_number, link_precedence, linked_id, created_at, updated_at, deleted_at";

/// Raw `contact` row as returned by PostgreSQL.
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i32,
    email: Option<String>,
    phone_number: Option<String>,
    link_precedence: String,
    linked_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = ContactRepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        Ok(Contact {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            link_precedence: row.link_precedence.parse()?,
            linked_id: row.linked_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

fn into_contacts(rows: Vec<ContactRow>) -> Result<Vec<Contact>, ContactRepositoryError> {
    rows.into_iter().map(Contact::try_from).collect()
}

/// PostgreSQL-backed contact repository.
///
/// Every transaction it opens applies the configured `StoreTimeouts` with
/// `SET LOCAL` semantics, so a blocked lock or a slow query surfaces as
/// `ContactRepositoryError::Timeout` instead of hanging the request.
pub struct PostgresContactRepository {
    pool: sqlx::PgPool,
    timeouts: StoreTimeouts,
}

impl PostgresContactRepository {
    /// Creates a repository over an existing pool with default timeouts.
    ///
    /// # Arguments
    ///
    /// * `pool` - Configured PostgreSQL connection pool with the `contact` table in place
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self::with_timeouts(pool, StoreTimeouts::default())
    }

    /// Creates a repository over an existing pool with custom timeouts.
    pub fn with_timeouts(pool: sqlx::PgPool, timeouts: StoreTimeouts) -> Self {
        Self { pool, timeouts }
    }

    /// Connects to `url`, optionally applies the embedded migrations, and
    /// returns a ready-to-use repository.
    ///
    /// # Returns
    ///
    /// * `Ok(PostgresContactRepository)` - Connected repository
    /// * `Err(ContactRepositoryError)` - Connection or migration failure
    pub async fn connect(
        url: &str,
        config: &RepositoryConfig,
    ) -> Result<Self, ContactRepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(url)
            .await?;

        if config.run_migrations {
            Self::migrate(&pool).await?;
        }

        info!(
            max_connections = config.max_connections,
            statement_timeout_ms = config.timeouts.statement_timeout.as_millis() as u64,
            lock_timeout_ms = config.timeouts.lock_timeout.as_millis() as u64,
            "PostgreSQL contact repository ready"
        );

        Ok(Self::with_timeouts(pool, config.timeouts))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), ContactRepositoryError> {
        sqlx::migrate!("src/postgres/migrations").run(pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }
}

#[async_trait]
impl ContactRepository for PostgresContactRepository {
    async fn begin(&self) -> Result<Box<dyn ContactTransaction>, ContactRepositoryError> {
        let mut tx = self.pool.begin().await?;

        // `is_local = true` scopes both settings to this transaction.
        sqlx::query(
            "SELECT set_config('statement_timeout', $1, true), \
                    set_config('lock_timeout', $2, true)",
        )
        .bind(format!("{}ms", self.timeouts.statement_timeout.as_millis()))
        .bind(format!("{}ms", self.timeouts.lock_timeout.as_millis()))
        .execute(&mut *tx)
        .await?;

        Ok(Box::new(PostgresContactTransaction { tx }))
    }
}

/// An open PostgreSQL transaction over the `contact` table.
pub struct PostgresContactTransaction {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl ContactTransaction for PostgresContactTransaction {
    async fn lock(&mut self, keys: &[LockKey]) -> Result<(), ContactRepositoryError> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();

        for key in &keys {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                .bind(key.lock_name())
                .execute(&mut *self.tx)
                .await?;
        }

        debug!(lock_count = keys.len(), "Advisory locks acquired");
        Ok(())
    }

    async fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<Vec<Contact>, ContactRepositoryError> {
        if email.is_none() && phone_number.is_none() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contact \
             WHERE deleted_at IS NULL \
               AND (($1::text IS NOT NULL AND email = $1) \
                 OR ($2::text IS NOT NULL AND phone_number = $2)) \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(email)
            .bind(phone_number)
            .fetch_all(&mut *self.tx)
            .await?;

        into_contacts(rows)
    }

    async fn find_by_ids_or_linked_ids(
        &mut self,
        ids: &[ContactId],
    ) -> Result<Vec<Contact>, ContactRepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contact \
             WHERE deleted_at IS NULL \
               AND (id = ANY($1) OR linked_id = ANY($1)) \
             ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;

        into_contacts(rows)
    }

    async fn create(&mut self, contact: NewContact) -> Result<Contact, ContactRepositoryError> {
        // clock_timestamp() rather than now(): several inserts in one
        // transaction must still get increasing creation times.
        let sql = format!(
            "INSERT INTO contact \
               (email, phone_number, link_precedence, linked_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, clock_timestamp(), clock_timestamp()) \
             RETURNING {CONTACT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(contact.email)
            .bind(contact.phone_number)
            .bind(contact.link_precedence.as_str())
            .bind(contact.linked_id)
            .fetch_one(&mut *self.tx)
            .await?;

        let created = Contact::try_from(row)?;
        debug!(
            contact_id = created.id,
            link_precedence = %created.link_precedence,
            linked_id = ?created.linked_id,
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

        let result = sqlx::query(
            "UPDATE contact \
             SET link_precedence = 'secondary', linked_id = $1, updated_at = clock_timestamp() \
             WHERE id = ANY($2) AND deleted_at IS NULL",
        )
        .bind(linked_id)
        .bind(ids)
        .execute(&mut *self.tx)
        .await?;

        debug!(
            linked_id,
            updated = result.rows_affected(),
            "Contacts relinked as secondaries"
        );
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), ContactRepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ContactRepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
