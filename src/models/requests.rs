//! Request DTOs for the site data API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::{Deserialize, Serialize};

use crate::models::OutageStatus;

/// Query flags shared by the read endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct FetchQuery {
    /// Bypass the shared cache and fetch directly
    #[serde(default)]
    pub skip_cache: bool,
}

/// Body of `POST /outages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOutage {
    pub title: String,
    pub description: String,
    pub status: OutageStatus,
    #[serde(default)]
    pub affected_components: Vec<String>,
}

/// Body of `PATCH /outages/:id`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutageUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OutageStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_components: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_query_default() {
        let query: FetchQuery = serde_json::from_str("{}").unwrap();
        assert!(!query.skip_cache);
    }

    #[test]
    fn test_new_outage_deserialize() {
        let json = r#"{"title":"API down","description":"5xx everywhere","status":"investigating"}"#;
        let req: NewOutage = serde_json::from_str(json).unwrap();

        assert_eq!(req.status, OutageStatus::Investigating);
        assert!(req.affected_components.is_empty());
    }

    #[test]
    fn test_outage_update_serializes_only_set_fields() {
        let update = OutageUpdate {
            status: Some(OutageStatus::Resolved),
            ..OutageUpdate::default()
        };
        let json = serde_json::to_value(&update).unwrap();

        assert_eq!(json, serde_json::json!({"status": "resolved"}));
    }
}
