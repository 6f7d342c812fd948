//! Request normalization and validation.

use identity_repository::LockKey;

use crate::errors::ResolveError;

/// Message returned when a request carries no identifier.
pub const MISSING_IDENTIFIER: &str = "email or phoneNumber is required";

/// A validated observation: at least one of `email` / `phone_number` is present.
///
/// Blank strings count as absent. Non-blank values are kept exactly as given,
/// since matching is exact equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityQuery {
    email: Option<String>,
    phone_number: Option<String>,
}

fn present(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

impl IdentityQuery {
    /// Validates the raw identifiers.
    ///
    /// # Returns
    ///
    /// * `Ok(IdentityQuery)` - At least one identifier is present
    /// * `Err(ResolveError::Validation)` - Both are absent or blank
    pub fn new(email: Option<&str>, phone_number: Option<&str>) -> Result<Self, ResolveError> {
        let email = present(email);
        let phone_number = present(phone_number);

        if email.is_none() && phone_number.is_none() {
            return Err(ResolveError::validation(MISSING_IDENTIFIER));
        }

        Ok(Self {
            email,
            phone_number,
        })
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Owned copies of both identifiers, for building a new contact.
    pub fn to_identifiers(&self) -> (Option<String>, Option<String>) {
        (self.email.clone(), self.phone_number.clone())
    }

    /// Identity locks serializing every request that observes the same email or phone.
    pub fn lock_keys(&self) -> Vec<LockKey> {
        let mut keys = Vec::with_capacity(2);
        if let Some(email) = &self.email {
            keys.push(LockKey::Email(email.clone()));
        }
        if let Some(phone) = &self.phone_number {
            keys.push(LockKey::Phone(phone.clone()));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_missing_is_a_validation_error() {
        let err = IdentityQuery::new(None, None).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Validation error: email or phoneNumber is required");
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        assert!(IdentityQuery::new(Some(""), Some("   ")).is_err());

        let query = IdentityQuery::new(Some(""), Some("123456")).unwrap();
        assert_eq!(query.email(), None);
        assert_eq!(query.phone_number(), Some("123456"));
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let query = IdentityQuery::new(Some("Mcfly@HillValley.edu"), None).unwrap();
        assert_eq!(query.email(), Some("Mcfly@HillValley.edu"));
    }

    #[test]
    fn test_lock_keys_cover_present_identifiers_only() {
        let query = IdentityQuery::new(Some("a@x.io"), None).unwrap();
        assert_eq!(query.lock_keys(), vec![LockKey::Email("a@x.io".to_string())]);

        let query = IdentityQuery::new(Some("a@x.io"), Some("1")).unwrap();
        assert_eq!(
            query.lock_keys(),
            vec![
                LockKey::Email("a@x.io".to_string()),
                LockKey::Phone("1".to_string()),
            ]
        );
    }
}
