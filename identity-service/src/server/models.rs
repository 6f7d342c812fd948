//! Wire models for the HTTP interface.

use identity_shared::ClusterView;
use serde::{Deserialize, Serialize};

/// Body of `POST /identify`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<PhoneNumberInput>,
}

/// A phone number sent either as a string or as a bare JSON number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PhoneNumberInput {
    Text(String),
    Number(serde_json::Number),
}

impl PhoneNumberInput {
    /// The phone number as stored: numbers are rendered in decimal.
    pub fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

/// Body of a successful `POST /identify`.
#[derive(Debug, Clone, Serialize)]
pub struct IdentifyResponse {
    pub contact: ClusterView,
}
