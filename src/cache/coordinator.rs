//! Shared Fetch Cache
//!
//! Read-through cache that deduplicates refreshes across every tab of an
//! origin. Tabs share nothing in memory: they coordinate through the
//! persistent store (entries plus a soft refresh lease per key) and the
//! broadcast channel (`cache-updated` / `cache-invalidated` notifications).
//!
//! Construct exactly one `SharedFetchCache` per tab and share it by `Arc`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::clock::duration_ms;
use crate::cache::{
    CacheEntry, CacheStats, Clock, CrossTabMessage, KvStore, RefreshLease, Subscription,
    SystemClock, TabChannel, MAX_KEY_LENGTH,
};
use crate::error::{CacheError, Result};

/// Default lease duration, also the default cross-tab wait timeout.
pub const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(10);

// == Cache Settings ==
/// Timing knobs of the coordinator.
///
/// The lease duration and the wait timeout are independent; they default to
/// the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    /// After this long an unreleased lease counts as abandoned
    pub lease_duration: Duration,
    /// How long a tab waits for another tab's `cache-updated` broadcast
    pub wait_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            lease_duration: DEFAULT_LEASE_DURATION,
            wait_timeout: DEFAULT_LEASE_DURATION,
        }
    }
}

// == Shared Fetch Cache ==
#[derive(Debug)]
pub struct SharedFetchCache {
    store: Arc<dyn KvStore>,
    channel: TabChannel,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
    stats: Mutex<CacheStats>,
}

impl SharedFetchCache {
    // == Constructor ==
    /// Creates the coordinator for one tab, using the system clock and
    /// default settings.
    pub fn new(store: Arc<dyn KvStore>, channel: TabChannel) -> Self {
        Self {
            store,
            channel,
            clock: Arc::new(SystemClock),
            settings: CacheSettings::default(),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    pub fn with_settings(mut self, settings: CacheSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Identity of this tab on the broadcast channel.
    pub fn tab_id(&self) -> &str {
        self.channel.id()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    /// Listens to notifications posted by other tabs.
    pub fn subscribe(&self) -> Subscription {
        self.channel.subscribe()
    }

    // == Get Or Fetch ==
    /// Returns the value for `key`, fetching it if the stored entry is older
    /// than `ttl`.
    ///
    /// - A fresh stored entry is returned without calling `fetch` or touching
    ///   the lease.
    /// - Otherwise the tab that wins the refresh lease calls `fetch`, stores
    ///   the result, broadcasts it and releases the lease. Its errors are
    ///   returned unchanged and nothing is stored.
    /// - A tab that finds the lease held waits up to the wait timeout for the
    ///   holder's broadcast, then falls back to any stored entry (even stale)
    ///   and finally to calling `fetch` itself.
    pub async fn get_or_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        ttl: Duration,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        validate_key(key)?;

        if let Some(entry) = self.read_entry::<T>(key) {
            let now = self.clock.now_ms();
            if entry.is_fresh(now, ttl) {
                self.record(CacheStats::record_hit);
                debug!(key, age_ms = entry.age_ms(now), "fresh cache hit");
                return Ok(entry.payload);
            }
        }
        self.record(CacheStats::record_miss);

        // Subscribe before looking at the lease so an update posted between
        // the lease check and the wait is not lost.
        let subscription = self.channel.subscribe().including_own();

        if self.try_acquire_lease(key) {
            drop(subscription);
            return self.refresh(key, fetch).await;
        }

        self.wait_for_update(key, subscription, fetch).await
    }

    // == Invalidate ==
    /// Removes the stored entry for `key` and tells the other tabs.
    ///
    /// The refresh lease is left alone. Invalidating a missing key still
    /// broadcasts.
    pub fn invalidate(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        if let Err(err) = self.store.remove(key) {
            warn!(key, error = %err, "failed to remove cache entry");
        }
        self.record(CacheStats::record_invalidation);
        self.channel.post(CrossTabMessage::invalidated(key));
        debug!(key, "cache invalidated");
        Ok(())
    }

    // == Cached ==
    /// Reads the stored entry regardless of its age.
    ///
    /// Corrupt entries are discarded and reported as absent, as are keys that
    /// fail validation.
    pub fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        if let Err(err) = validate_key(key) {
            debug!(error = %err, "cached read of invalid key");
            return None;
        }
        self.read_entry(key)
    }

    async fn refresh<T, E, F, Fut>(&self, key: &str, fetch: F) -> std::result::Result<T, E>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let lease = LeaseGuard { cache: self, key };
        self.record(CacheStats::record_fetch);
        debug!(key, "refresh lease acquired, fetching");

        match fetch().await {
            Ok(payload) => {
                self.store_payload(key, &payload, true);
                drop(lease);
                Ok(payload)
            }
            Err(err) => {
                self.record(CacheStats::record_fetch_failure);
                warn!(key, "fetch failed, releasing refresh lease");
                drop(lease);
                Err(err)
            }
        }
    }

    async fn wait_for_update<T, E, F, Fut>(
        &self,
        key: &str,
        mut subscription: Subscription,
        fetch: F,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.record(CacheStats::record_lease_wait);
        debug!(key, "refresh lease busy, waiting for cross-tab update");

        let waited = tokio::time::timeout(
            self.settings.wait_timeout,
            self.next_update::<T>(key, &mut subscription),
        )
        .await;
        drop(subscription);

        match waited {
            Ok(Some(payload)) => {
                self.record(CacheStats::record_broadcast_hit);
                debug!(key, "resolved from cross-tab update");
                return Ok(payload);
            }
            Ok(None) => debug!(key, "broadcast channel closed while waiting"),
            Err(_) => {
                self.record(CacheStats::record_wait_timeout);
                info!(
                    key,
                    timeout_ms = duration_ms(self.settings.wait_timeout),
                    "cross-tab wait timed out"
                );
            }
        }

        if let Some(entry) = self.read_entry::<T>(key) {
            self.record(CacheStats::record_stale_fallback);
            debug!(key, "serving stored entry after wait");
            return Ok(entry.payload);
        }

        debug!(key, "nothing stored after wait, fetching without lease");
        self.record(CacheStats::record_fetch);
        match fetch().await {
            Ok(payload) => {
                self.store_payload(key, &payload, false);
                Ok(payload)
            }
            Err(err) => {
                self.record(CacheStats::record_fetch_failure);
                warn!(key, "fallback fetch failed");
                Err(err)
            }
        }
    }

    async fn next_update<T: DeserializeOwned>(
        &self,
        key: &str,
        subscription: &mut Subscription,
    ) -> Option<T> {
        while let Some(message) = subscription.recv().await {
            let CrossTabMessage::CacheUpdated {
                key: updated,
                payload,
            } = message
            else {
                continue;
            };
            if updated != key {
                continue;
            }
            match serde_json::from_value::<T>(payload) {
                Ok(payload) => return Some(payload),
                Err(err) => {
                    self.record(CacheStats::record_corrupt_entry);
                    warn!(key, error = %err, "ignoring undecodable cross-tab payload");
                }
            }
        }
        None
    }

    // == Lease Handling ==
    /// Read-then-write acquisition. Not atomic: two tabs racing within the
    /// same instant may both win and both fetch.
    fn try_acquire_lease(&self, key: &str) -> bool {
        let lease_key = RefreshLease::storage_key(key);
        let now = self.clock.now_ms();

        match self.store.get(&lease_key) {
            Ok(Some(raw)) => match serde_json::from_str::<RefreshLease>(&raw) {
                Ok(lease) if lease.is_held(now, self.settings.lease_duration) => {
                    debug!(key, holder = %lease.holder, "refresh lease held");
                    return false;
                }
                Ok(lease) => debug!(key, holder = %lease.holder, "reclaiming abandoned lease"),
                Err(err) => {
                    self.record(CacheStats::record_corrupt_entry);
                    warn!(key, error = %err, "discarding corrupt refresh lease");
                }
            },
            Ok(None) => {}
            Err(err) => warn!(key, error = %err, "failed to read refresh lease"),
        }

        let lease = RefreshLease::new(now, self.channel.id());
        if let Err(err) = write_json(self.store.as_ref(), &lease_key, &lease) {
            warn!(key, error = %err, "failed to write refresh lease");
        }
        true
    }

    /// Deletes the lease unless another tab has since taken it over.
    fn release_lease(&self, key: &str) {
        let lease_key = RefreshLease::storage_key(key);

        if let Ok(Some(raw)) = self.store.get(&lease_key) {
            if let Ok(lease) = serde_json::from_str::<RefreshLease>(&raw) {
                if !lease.holder.is_empty() && lease.holder != self.channel.id() {
                    debug!(key, holder = %lease.holder, "lease taken over, leaving it");
                    return;
                }
            }
        }

        if let Err(err) = self.store.remove(&lease_key) {
            warn!(key, error = %err, "failed to release refresh lease");
        }
    }

    // == Storage Helpers ==
    fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                let err = CacheError::Corrupt {
                    key: key.to_string(),
                    reason: err.to_string(),
                };
                self.record(CacheStats::record_corrupt_entry);
                warn!(error = %err, "discarding corrupt cache entry");
                if let Err(err) = self.store.remove(key) {
                    warn!(key, error = %err, "failed to remove corrupt entry");
                }
                None
            }
        }
    }

    /// Writes `{payload, fetchedAt: now}` and optionally broadcasts it.
    ///
    /// Storage failures are logged; the fetched payload is still returned to
    /// the caller.
    fn store_payload<T: Serialize>(&self, key: &str, payload: &T, broadcast: bool) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "payload is not serializable, not cached");
                return;
            }
        };

        let entry: CacheEntry<&Value> = CacheEntry::new(&value, self.clock.now_ms());
        if let Err(err) = write_json(self.store.as_ref(), key, &entry) {
            warn!(key, error = %err, "failed to store cache entry");
        }

        if broadcast {
            self.channel.post(CrossTabMessage::updated(key, value));
        }
    }

    fn record(&self, update: impl FnOnce(&mut CacheStats)) {
        update(&mut *self.stats.lock());
    }
}

/// Releases the lease when the refresh ends, including when the caller stops
/// polling mid-fetch.
struct LeaseGuard<'a> {
    cache: &'a SharedFetchCache,
    key: &'a str,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        self.cache.release_lease(self.key);
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    // Such a key would alias another key's lease slot.
    if key.ends_with(RefreshLease::KEY_SUFFIX) {
        return Err(CacheError::InvalidKey(format!(
            "key cannot end with '{}'",
            RefreshLease::KEY_SUFFIX
        )));
    }
    Ok(())
}

fn write_json<V: Serialize>(store: &dyn KvStore, key: &str, value: &V) -> Result<()> {
    let raw =
        serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
    store.set(key, &raw)
}
