//! Service outage records managed from the admin page.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of an outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutageStatus {
    Investigating,
    Identified,
    Monitoring,
    Resolved,
}

/// An outage as stored by the bot API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outage {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: OutageStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub affected_components: Vec<String>,
}

impl Outage {
    pub fn is_active(&self) -> bool {
        self.status != OutageStatus::Resolved
    }
}
