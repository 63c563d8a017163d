//! Cache Entry Module
//!
//! Defines the stored shape of cached payloads and refresh leases.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// The last successfully fetched payload for a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The stored payload
    pub payload: T,
    /// When the payload was stored (Unix milliseconds)
    pub fetched_at: u64,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    pub fn new(payload: T, fetched_at: u64) -> Self {
        Self {
            payload,
            fetched_at,
        }
    }

    // == Age ==
    /// Milliseconds elapsed since the payload was stored.
    ///
    /// A timestamp from the future (clock skew between tabs) counts as age 0.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.fetched_at)
    }

    // == Is Fresh ==
    /// Checks whether the entry is still inside its freshness window.
    ///
    /// Boundary condition: an entry whose age equals the TTL is stale.
    pub fn is_fresh(&self, now: u64, ttl: Duration) -> bool {
        u128::from(self.age_ms(now)) < ttl.as_millis()
    }
}

// == Refresh Lease ==
/// Soft lease taken by the tab that performs a refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshLease {
    /// When the lease was taken (Unix milliseconds)
    pub acquired_at: u64,
    /// Id of the tab channel holding the lease
    #[serde(default)]
    pub holder: String,
}

impl RefreshLease {
    /// Suffix appended to a resource key to form its lease slot.
    pub const KEY_SUFFIX: &'static str = ":refresh-lease";

    pub fn new(acquired_at: u64, holder: impl Into<String>) -> Self {
        Self {
            acquired_at,
            holder: holder.into(),
        }
    }

    /// Storage slot of the lease guarding `key`.
    pub fn storage_key(key: &str) -> String {
        format!("{}{}", key, Self::KEY_SUFFIX)
    }

    /// A lease older than `lease_duration` is abandoned and may be reclaimed.
    pub fn is_held(&self, now: u64, lease_duration: Duration) -> bool {
        u128::from(now.saturating_sub(self.acquired_at)) < lease_duration.as_millis()
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
