//! Cluster merging.
//!
//! When an observation touches several clusters they are the same identity.
//! The oldest root survives as the true primary; every other member is
//! re-linked straight to it, so links never form chains.

use identity_repository::ContactTransaction;
use identity_shared::{Contact, ContactId};
use tracing::info;

use crate::errors::ResolveError;

/// Result of merging the clusters found by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The root that stays primary.
    pub true_primary: Contact,
    /// Live members of the merged cluster, as stored after the merge.
    pub members: Vec<Contact>,
    /// Former roots that became secondaries.
    pub demoted_roots: Vec<ContactId>,
    /// Number of contacts whose link was rewritten (demoted roots included).
    pub relinked: u64,
}

/// Root with the earliest `created_at`, the smallest id on ties.
pub fn select_true_primary(roots: &[Contact]) -> Option<&Contact> {
    roots.iter().min_by_key(|root| root.creation_key())
}

/// Members that must be re-linked to `true_primary`: everything except the
/// true primary itself and the secondaries already pointing at it.
pub fn relink_targets(true_primary: ContactId, members: &[Contact]) -> Vec<ContactId> {
    members
        .iter()
        .filter(|member| member.id != true_primary && member.linked_id != Some(true_primary))
        .map(|member| member.id)
        .collect()
}

/// Collapses the clusters of an observation into one.
pub struct MergeEngine;

impl MergeEngine {
    /// Merges the clusters rooted at `roots` whose members are `members`.
    ///
    /// With a single root nothing is written. With several, one batched
    /// `update_many_precedence` demotes the other roots and re-points their
    /// secondaries at the true primary, then the merged cluster is re-read.
    ///
    /// # Returns
    ///
    /// * `Ok(MergeOutcome)` - The true primary and the merged members
    /// * `Err(ResolveError::ConsistencyViolation)` - No roots were given, or a member vanished under lock
    /// * `Err(ResolveError::Storage)` - The store failed
    pub async fn merge(
        tx: &mut dyn ContactTransaction,
        roots: Vec<Contact>,
        members: Vec<Contact>,
    ) -> Result<MergeOutcome, ResolveError> {
        let true_primary = select_true_primary(&roots)
            .cloned()
            .ok_or_else(|| ResolveError::consistency("cannot merge an empty set of clusters"))?;

        if roots.len() == 1 {
            return Ok(MergeOutcome {
                true_primary,
                members,
                demoted_roots: Vec::new(),
                relinked: 0,
            });
        }

        let demoted_roots: Vec<ContactId> = roots
            .iter()
            .map(|root| root.id)
            .filter(|id| *id != true_primary.id)
            .collect();
        let targets = relink_targets(true_primary.id, &members);

        let relinked = tx.update_many_precedence(&targets, true_primary.id).await?;
        if relinked != targets.len() as u64 {
            return Err(ResolveError::consistency(format!(
                "expected to relink {} contacts under {}, relinked {}",
                targets.len(),
                true_primary.id,
                relinked
            )));
        }

        let members = tx.find_by_ids_or_linked_ids(&[true_primary.id]).await?;

        info!(
            true_primary = true_primary.id,
            demoted_roots = ?demoted_roots,
            relinked,
            "Clusters merged"
        );

        Ok(MergeOutcome {
            true_primary,
            members,
            demoted_roots,
            relinked,
        })
    }
}
