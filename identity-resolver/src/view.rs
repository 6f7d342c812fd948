//! Consolidated cluster views.

use std::collections::HashSet;
use std::hash::Hash;

use identity_shared::{ClusterView, Contact};

/// Ordered list of distinct values where the first occurrence wins.
#[derive(Debug)]
struct FirstSeen<T> {
    items: Vec<T>,
    seen: HashSet<T>,
}

impl<T: Clone + Eq + Hash> FirstSeen<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn push(&mut self, value: &T) {
        if self.seen.insert(value.clone()) {
            self.items.push(value.clone());
        }
    }

    fn into_vec(self) -> Vec<T> {
        self.items
    }
}

/// Builds the view returned to callers.
pub struct ViewBuilder;

impl ViewBuilder {
    /// Builds the view of the cluster rooted at `primary`.
    ///
    /// `members` are the live cluster members ordered by creation; the primary
    /// may or may not be among them. The primary's own email and phone come
    /// first, then the other members' values in member order. Every member
    /// other than the primary is listed as a secondary.
    pub fn build(primary: &Contact, members: &[Contact]) -> ClusterView {
        let mut emails = FirstSeen::new();
        let mut phone_numbers = FirstSeen::new();
        let mut secondary_contact_ids = Vec::new();

        if let Some(email) = &primary.email {
            emails.push(email);
        }
        if let Some(phone) = &primary.phone_number {
            phone_numbers.push(phone);
        }

        for member in members.iter().filter(|m| m.id != primary.id) {
            secondary_contact_ids.push(member.id);
            if let Some(email) = &member.email {
                emails.push(email);
            }
            if let Some(phone) = &member.phone_number {
                phone_numbers.push(phone);
            }
        }

        ClusterView {
            primary_contact_id: primary.id,
            emails: emails.into_vec(),
            phone_numbers: phone_numbers.into_vec(),
            secondary_contact_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use identity_shared::LinkPrecedence;

    fn contact(
        id: i32,
        email: Option<&str>,
        phone: Option<&str>,
        linked_id: Option<i32>,
    ) -> Contact {
        let at = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, id as u32).unwrap();
        Contact {
            id,
            email: email.map(str::to_string),
            phone_number: phone.map(str::to_string),
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
    fn test_single_primary() {
        let primary = contact(1, Some("lorraine@hillvalley.edu"), Some("123456"), None);
        let view = ViewBuilder::build(&primary, std::slice::from_ref(&primary));

        assert_eq!(view.primary_contact_id, 1);
        assert_eq!(view.emails, vec!["lorraine@hillvalley.edu"]);
        assert_eq!(view.phone_numbers, vec!["123456"]);
        assert!(view.secondary_contact_ids.is_empty());
    }

    #[test]
    fn test_primary_values_come_first_and_duplicates_collapse() {
        // An earlier secondary (legacy data) must not push its values ahead of the primary's.
        let early_secondary = contact(1, Some("mcfly@hillvalley.edu"), Some("123456"), Some(2));
        let primary = contact(2, Some("lorraine@hillvalley.edu"), Some("123456"), None);
        let later = contact(23, Some("mcfly@hillvalley.edu"), None, Some(2));

        let members = vec![early_secondary, primary.clone(), later];
        let view = ViewBuilder::build(&primary, &members);

        assert_eq!(view.emails, vec!["lorraine@hillvalley.edu", "mcfly@hillvalley.edu"]);
        assert_eq!(view.phone_numbers, vec!["123456"]);
        assert_eq!(view.secondary_contact_ids, vec![1, 23]);
    }

    #[test]
    fn test_primary_without_email_lists_secondary_emails() {
        let primary = contact(1, None, Some("919191"), None);
        let secondary = contact(2, Some("biff@hillvalley.edu"), Some("919191"), Some(1));

        let view = ViewBuilder::build(&primary, &[primary.clone(), secondary]);

        assert_eq!(view.emails, vec!["biff@hillvalley.edu"]);
        assert_eq!(view.phone_numbers, vec!["919191"]);
        assert_eq!(view.secondary_contact_ids, vec![2]);
    }
}
