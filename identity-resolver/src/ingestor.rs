//! Observation ingestion.
//!
//! An observation is only written when it tells the cluster something new:
//! an email or a phone number no member carries yet. Repeating a known
//! observation is a pure read.

use std::collections::HashSet;

use identity_repository::ContactTransaction;
use identity_shared::{Contact, NewContact};
use tracing::{debug, info};

use crate::errors::ResolveError;
use crate::input::IdentityQuery;

/// Whether `query` carries an email or phone number absent from `members`.
pub fn has_new_information(query: &IdentityQuery, members: &[Contact]) -> bool {
    let emails: HashSet<&str> = members.iter().filter_map(|m| m.email.as_deref()).collect();
    let phones: HashSet<&str> = members
        .iter()
        .filter_map(|m| m.phone_number.as_deref())
        .collect();

    let new_email = query.email().is_some_and(|email| !emails.contains(email));
    let new_phone = query
        .phone_number()
        .is_some_and(|phone| !phones.contains(phone));

    new_email || new_phone
}

/// Writes observations into the store.
pub struct ObservationIngestor;

impl ObservationIngestor {
    /// Records an observation that matched nothing as a fresh primary.
    pub async fn create_primary(
        tx: &mut dyn ContactTransaction,
        query: &IdentityQuery,
    ) -> Result<Contact, ResolveError> {
        let (email, phone_number) = query.to_identifiers();
        let primary = tx.create(NewContact::primary(email, phone_number)).await?;

        info!(contact_id = primary.id, "New identity created");
        Ok(primary)
    }

    /// Appends the observation to the cluster of `true_primary` when it carries
    /// new information.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Contact))` - The secondary that was created
    /// * `Ok(None)` - The cluster already knows both values; nothing was written
    /// * `Err(ResolveError::Storage)` - The store failed
    pub async fn ingest(
        tx: &mut dyn ContactTransaction,
        query: &IdentityQuery,
        true_primary: &Contact,
        members: &[Contact],
    ) -> Result<Option<Contact>, ResolveError> {
        if !has_new_information(query, members) {
            debug!(primary_id = true_primary.id, "Observation already known to cluster");
            return Ok(None);
        }

        let (email, phone_number) = query.to_identifiers();
        let secondary = tx
            .create(NewContact::secondary(email, phone_number, true_primary.id))
            .await?;

        info!(
            contact_id = secondary.id,
            primary_id = true_primary.id,
            "Observation appended to cluster"
        );
        Ok(Some(secondary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use identity_shared::LinkPrecedence;

    fn member(id: i32, email: Option<&str>, phone: Option<&str>) -> Contact {
        let now = Utc::now();
        Contact {
            id,
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
            link_precedence: LinkPrecedence::Primary,
            linked_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_known_values_on_different_members_are_not_new() {
        let members = vec![member(1, Some("a@x.io"), None), member(2, None, Some("1"))];
        let query = IdentityQuery::new(Some("a@x.io"), Some("1")).unwrap();
        assert!(!has_new_information(&query, &members));
    }

    #[test]
    fn test_new_phone_is_new_information() {
        let members = vec![member(1, Some("a@x.io"), None)];
        let query = IdentityQuery::new(Some("a@x.io"), Some("2")).unwrap();
        assert!(has_new_information(&query, &members));
    }

    #[test]
    fn test_absent_side_never_counts_as_new() {
        let members = vec![member(1, Some("a@x.io"), None)];
        let query = IdentityQuery::new(Some("a@x.io"), None).unwrap();
        assert!(!has_new_information(&query, &members));
    }
}
