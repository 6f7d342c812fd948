//! Consolidated view of one identity cluster.

use serde::{Deserialize, Serialize};

use super::contact::ContactId;

/// The consolidated identity returned to callers.
///
/// `emails` and `phone_numbers` hold distinct values with the primary's own
/// values first, followed by the other members' values in creation order.
/// `secondary_contact_ids` lists every member except the primary, in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterView {
    pub primary_contact_id: ContactId,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub secondary_contact_ids: Vec<ContactId>,
}
