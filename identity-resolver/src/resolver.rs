//! Cluster lookup.
//!
//! Finds every cluster an observation touches and returns the roots of those
//! clusters together with all of their members. Lookup happens under
//! transaction-scoped locks: first on the observation's email/phone, then on
//! each root found, so that a concurrent merge or append touching the same
//! clusters waits for this transaction instead of interleaving with it.

use std::collections::{BTreeSet, HashSet};

use identity_repository::{ContactTransaction, LockKey};
use identity_shared::{Contact, ContactId};
use tracing::{debug, error};

use crate::errors::ResolveError;
use crate::input::IdentityQuery;

/// How many times lookup restarts when a root changed before it was locked.
pub const MAX_RESOLUTION_ROUNDS: usize = 3;

/// Outcome of a cluster lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No live contact shares the observation's email or phone.
    NoCluster,
    /// The observation touches one or more clusters.
    Clusters {
        /// Distinct roots, in first-seen order. Every one is a live primary.
        roots: Vec<Contact>,
        /// Every live member of those clusters, roots included, ordered by
        /// `created_at` and then `id`.
        members: Vec<Contact>,
    },
}

/// Distinct root ids of `matched`, in first-seen order.
///
/// A secondary without a `linked_id` has no root and is reported as a
/// consistency violation.
pub fn root_ids(matched: &[Contact]) -> Result<Vec<ContactId>, ResolveError> {
    let mut seen = HashSet::new();
    let mut roots = Vec::new();

    for contact in matched {
        let root = contact.root_id().ok_or_else(|| {
            ResolveError::consistency(format!(
                "secondary contact {} has no linked contact",
                contact.id
            ))
        })?;
        if seen.insert(root) {
            roots.push(root);
        }
    }

    Ok(roots)
}

/// Root problems found when checking a fetched super-cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootCheck {
    /// Every root is present and primary.
    Valid(Vec<Contact>),
    /// The root is not among the live members (missing or soft-deleted).
    Missing(ContactId),
    /// The root is itself a secondary.
    Demoted { root: ContactId, linked_id: Option<ContactId> },
}

/// Checks that each id in `root_ids` is a live primary inside `members`.
pub fn check_roots(root_ids: &[ContactId], members: &[Contact]) -> RootCheck {
    let mut roots = Vec::with_capacity(root_ids.len());

    for id in root_ids {
        match members.iter().find(|member| member.id == *id) {
            None => return RootCheck::Missing(*id),
            Some(root) if !root.is_primary() => {
                return RootCheck::Demoted {
                    root: root.id,
                    linked_id: root.linked_id,
                }
            }
            Some(root) => roots.push(root.clone()),
        }
    }

    RootCheck::Valid(roots)
}

/// Looks up the clusters touched by an observation.
pub struct ClusterResolver;

impl ClusterResolver {
    /// Resolves `query` to the clusters it touches.
    ///
    /// Locks the query's identity keys, matches contacts by email or phone,
    /// locks the roots of the matches and fetches the full super-cluster.
    /// When a root turns out to have changed between the match and its lock,
    /// the lookup restarts (still holding every lock taken so far). A root that
    /// is wrong although it was read under its lock is an invariant breach.
    ///
    /// # Returns
    ///
    /// * `Ok(Resolution::NoCluster)` - Nothing matches
    /// * `Ok(Resolution::Clusters { .. })` - Roots and members of the touched clusters
    /// * `Err(ResolveError::ConsistencyViolation)` - A stored link points to a missing or secondary contact
    /// * `Err(ResolveError::Storage)` - The store failed
    pub async fn resolve(
        tx: &mut dyn ContactTransaction,
        query: &IdentityQuery,
    ) -> Result<Resolution, ResolveError> {
        tx.lock(&query.lock_keys()).await?;

        let mut locked_roots: BTreeSet<ContactId> = BTreeSet::new();

        for round in 1..=MAX_RESOLUTION_ROUNDS {
            let matched = tx
                .find_by_email_or_phone(query.email(), query.phone_number())
                .await?;
            if matched.is_empty() {
                return Ok(Resolution::NoCluster);
            }

            let root_ids = root_ids(&matched)?;
            let new_locks: Vec<LockKey> = root_ids
                .iter()
                .filter(|id| locked_roots.insert(**id))
                .map(|id| LockKey::Cluster(*id))
                .collect();
            let read_under_lock = new_locks.is_empty();
            if !read_under_lock {
                tx.lock(&new_locks).await?;
            }

            let members = tx.find_by_ids_or_linked_ids(&root_ids).await?;

            let problem = match check_roots(&root_ids, &members) {
                RootCheck::Valid(roots) => {
                    debug!(
                        round,
                        matched = matched.len(),
                        roots = roots.len(),
                        members = members.len(),
                        "Clusters resolved"
                    );
                    return Ok(Resolution::Clusters { roots, members });
                }
                RootCheck::Missing(root) => {
                    format!("contact links to missing or deleted root {root}")
                }
                RootCheck::Demoted { root, linked_id } => format!(
                    "contact links to root {root}, which is itself a secondary of {linked_id:?}"
                ),
            };

            if read_under_lock || round == MAX_RESOLUTION_ROUNDS {
                error!(round, problem = %problem, "Stored clusters violate link invariants");
                return Err(ResolveError::consistency(problem));
            }

            debug!(round, problem = %problem, "Root changed before it was locked, resolving again");
        }

        Err(ResolveError::consistency(format!(
            "clusters did not settle after {MAX_RESOLUTION_ROUNDS} rounds"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use identity_shared::LinkPrecedence;

    fn contact(id: ContactId, linked_id: Option<ContactId>) -> Contact {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, id as u32).unwrap();
        Contact {
            id,
            email: None,
            phone_number: Some(format!("{id}")),
            link_precedence: if linked_id.is_some() {
                LinkPrecedence::Secondary
            } else {
                LinkPrecedence::Primary
            },
            linked_id,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_root_ids_dedup_in_first_seen_order() {
        let matched = vec![
            contact(5, Some(2)),
            contact(2, None),
            contact(7, None),
            contact(8, Some(7)),
        ];
        assert_eq!(root_ids(&matched).unwrap(), vec![2, 7]);
    }

    #[test]
    fn test_root_ids_rejects_unlinked_secondary() {
        let mut orphan = contact(3, Some(1));
        orphan.linked_id = None;

        let err = root_ids(&[orphan]).unwrap_err();
        assert!(matches!(err, ResolveError::ConsistencyViolation(_)));
    }

    #[test]
    fn test_check_roots_valid() {
        let members = vec![contact(1, None), contact(2, Some(1)), contact(4, None)];
        match check_roots(&[4, 1], &members) {
            RootCheck::Valid(roots) => {
                assert_eq!(roots.iter().map(|r| r.id).collect::<Vec<_>>(), vec![4, 1]);
            }
            other => panic!("expected valid roots, got {other:?}"),
        }
    }

    #[test]
    fn test_check_roots_reports_missing_and_demoted() {
        let members = vec![contact(1, None), contact(2, Some(1))];
        assert_eq!(check_roots(&[1, 9], &members), RootCheck::Missing(9));
        assert_eq!(
            check_roots(&[2], &members),
            RootCheck::Demoted {
                root: 2,
                linked_id: Some(1)
            }
        );
    }
}
