//! The identity resolution entry point.

use std::sync::Arc;

use identity_repository::{ContactRepository, ContactRepositoryError, ContactTransaction};
use identity_shared::ClusterView;
use tokio::time::timeout;
use tracing::{instrument, warn};

use crate::config::ResolverConfig;
use crate::errors::ResolveError;
use crate::ingestor::ObservationIngestor;
use crate::input::IdentityQuery;
use crate::merge::MergeEngine;
use crate::resolver::{ClusterResolver, Resolution};
use crate::view::ViewBuilder;

/// Resolves observations to consolidated identities.
///
/// Holds no state besides the injected store, so one instance is shared by
/// every request. Each call runs lookup, merge, ingestion and view building in
/// a single store transaction: it commits on success and rolls back on any
/// error or timeout, so a merge is never visible without the record created
/// alongside it.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use identity_repository::InMemoryContactRepository;
/// use identity_resolver::IdentityResolver;
///
/// # async fn example() -> Result<(), identity_resolver::ResolveError> {
/// let resolver = IdentityResolver::new(Arc::new(InMemoryContactRepository::new()));
/// let view = resolver
///     .resolve_identity(Some("mcfly@hillvalley.edu"), Some("123456"))
///     .await?;
/// assert!(view.secondary_contact_ids.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct IdentityResolver {
    repository: Arc<dyn ContactRepository>,
    config: ResolverConfig,
}

impl IdentityResolver {
    /// Create a resolver with default configuration.
    pub fn new(repository: Arc<dyn ContactRepository>) -> Self {
        Self::with_config(repository, ResolverConfig::default())
    }

    /// Create a resolver with custom configuration.
    pub fn with_config(repository: Arc<dyn ContactRepository>, config: ResolverConfig) -> Self {
        Self { repository, config }
    }

    /// Resolves an observation to its identity cluster.
    ///
    /// # Arguments
    ///
    /// * `email` - Observed email; blank counts as absent
    /// * `phone_number` - Observed phone number; blank counts as absent
    ///
    /// # Returns
    ///
    /// * `Ok(ClusterView)` - The consolidated identity after this observation
    /// * `Err(ResolveError::Validation)` - Neither identifier is present
    /// * `Err(ResolveError::Storage)` - The store failed or the request timed out; nothing was written
    /// * `Err(ResolveError::ConsistencyViolation)` - Stored clusters break link invariants; nothing was written
    #[instrument(
        skip_all,
        fields(has_email = email.is_some(), has_phone_number = phone_number.is_some())
    )]
    pub async fn resolve_identity(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> Result<ClusterView, ResolveError> {
        let query = IdentityQuery::new(email, phone_number)?;

        match timeout(self.config.request_timeout, self.run(&query)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.request_timeout.as_millis() as u64,
                    "Identity resolution timed out"
                );
                Err(ContactRepositoryError::timeout(format!(
                    "identity resolution exceeded {}ms",
                    self.config.request_timeout.as_millis()
                ))
                .into())
            }
        }
    }

    async fn run(&self, query: &IdentityQuery) -> Result<ClusterView, ResolveError> {
        let mut tx = self.repository.begin().await?;

        match Self::resolve_in(tx.as_mut(), query).await {
            Ok(view) => {
                tx.commit().await?;
                Ok(view)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed after resolution error");
                }
                Err(err)
            }
        }
    }

    async fn resolve_in(
        tx: &mut dyn ContactTransaction,
        query: &IdentityQuery,
    ) -> Result<ClusterView, ResolveError> {
        match ClusterResolver::resolve(tx, query).await? {
            Resolution::NoCluster => {
                let primary = ObservationIngestor::create_primary(tx, query).await?;
                Ok(ViewBuilder::build(&primary, std::slice::from_ref(&primary)))
            }
            Resolution::Clusters { roots, members } => {
                let merged = MergeEngine::merge(tx, roots, members).await?;
                ObservationIngestor::ingest(tx, query, &merged.true_primary, &merged.members)
                    .await?;

                let cluster = tx
                    .find_by_ids_or_linked_ids(&[merged.true_primary.id])
                    .await?;
                Ok(ViewBuilder::build(&merged.true_primary, &cluster))
            }
        }
    }
}
