//! Contact record types.
//!
//! A `Contact` is one stored identity observation. Contacts are grouped into
//! clusters: one `primary` contact plus every `secondary` contact whose
//! `linked_id` points at it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a stored contact. Assigned by the store, increasing in creation order.
pub type ContactId = i32;

/// Position of a contact inside its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    Primary,
    Secondary,
}

impl LinkPrecedence {
    /// Textual form used by the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a stored precedence is neither `primary` nor `secondary`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown link precedence: {0}")]
pub struct ParseLinkPrecedenceError(pub String);

impl FromStr for LinkPrecedence {
    type Err = ParseLinkPrecedenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            other => Err(ParseLinkPrecedenceError(other.to_string())),
        }
    }
}

/// A stored identity observation.
///
/// `id`, `email`, `phone_number` and `created_at` never change after creation.
/// `link_precedence`, `linked_id` and `updated_at` change when the contact's
/// cluster is absorbed by another one during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub link_precedence: LinkPrecedence,
    pub linked_id: Option<ContactId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn is_primary(&self) -> bool {
        self.link_precedence == LinkPrecedence::Primary
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Id of the cluster root this contact belongs to, as currently stored.
    ///
    /// A primary is its own root. A secondary without a `linked_id` has no
    /// resolvable root and returns `None`.
    pub fn root_id(&self) -> Option<ContactId> {
        match self.link_precedence {
            LinkPrecedence::Primary => Some(self.id),
            LinkPrecedence::Secondary => self.linked_id,
        }
    }

    /// Ordering key used everywhere a deterministic creation order is needed:
    /// earliest `created_at` first, smaller `id` on ties.
    pub fn creation_key(&self) -> (DateTime<Utc>, ContactId) {
        (self.created_at, self.id)
    }
}

/// Insert payload for a new contact.
///
/// Built through [`NewContact::primary`] or [`NewContact::secondary`] so that
/// `linked_id` is present exactly when the precedence is `secondary`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub link_precedence: LinkPrecedence,
    pub linked_id: Option<ContactId>,
}

impl NewContact {
    pub fn primary(email: Option<String>, phone_number: Option<String>) -> Self {
        Self {
            email,
            phone_number,
            link_precedence: LinkPrecedence::Primary,
            linked_id: None,
        }
    }

    pub fn secondary(
        email: Option<String>,
        phone_number: Option<String>,
        linked_id: ContactId,
    ) -> Self {
        Self {
            email,
            phone_number,
            link_precedence: LinkPrecedence::Secondary,
            linked_id: Some(linked_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn contact(id: ContactId, precedence: LinkPrecedence, linked_id: Option<ContactId>) -> Contact {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Contact {
            id,
            email: Some("doc@hillvalley.edu".to_string()),
            phone_number: None,
            link_precedence: precedence,
            linked_id,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn test_link_precedence_round_trips_through_text() {
        assert_eq!("primary".parse::<LinkPrecedence>().unwrap(), LinkPrecedence::Primary);
        assert_eq!("secondary".parse::<LinkPrecedence>().unwrap(), LinkPrecedence::Secondary);
        assert_eq!(LinkPrecedence::Secondary.to_string(), "secondary");
    }

    #[test]
    fn test_link_precedence_rejects_unknown_value() {
        let err = "tertiary".parse::<LinkPrecedence>().unwrap_err();
        assert_eq!(err, ParseLinkPrecedenceError("tertiary".to_string()));
    }

    #[test]
    fn test_root_id() {
        assert_eq!(contact(1, LinkPrecedence::Primary, None).root_id(), Some(1));
        assert_eq!(contact(2, LinkPrecedence::Secondary, Some(1)).root_id(), Some(1));
        assert_eq!(contact(3, LinkPrecedence::Secondary, None).root_id(), None);
    }

    #[test]
    fn test_new_contact_constructors_keep_link_invariant() {
        let primary = NewContact::primary(Some("a@b.c".to_string()), None);
        assert_eq!(primary.link_precedence, LinkPrecedence::Primary);
        assert_eq!(primary.linked_id, None);

        let secondary = NewContact::secondary(None, Some("123456".to_string()), 7);
        assert_eq!(secondary.link_precedence, LinkPrecedence::Secondary);
        assert_eq!(secondary.linked_id, Some(7));
    }

    #[test]
    fn test_contact_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(contact(5, LinkPrecedence::Secondary, Some(1))).unwrap();
        assert_eq!(json["linkPrecedence"], "secondary");
        assert_eq!(json["linkedId"], 1);
        assert!(json.get("phoneNumber").is_some());
    }
}
