//! Site Data Module
//!
//! The data layer the site's pages call into: every read goes through the
//! shared fetch cache, every write invalidates the affected key.

mod fallback;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::SharedFetchCache;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    total_stats, CommandsResponse, NewOutage, Outage, OutageUpdate, ShardData, StatusResponse,
    StatusState, DEGRADED_LATENCY_MS,
};
use crate::upstream::SiteApi;

pub use fallback::load_static_commands;

/// Storage key of the shard statistics.
pub const SHARDS_CACHE_KEY: &str = "greed_shard_data";
/// Storage key of the outage list.
pub const OUTAGES_CACHE_KEY: &str = "greed_outages_data";
/// Storage key of the command list.
pub const COMMANDS_CACHE_KEY: &str = "greed_commands_data";

/// Freshness windows per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceTtls {
    pub stats: Duration,
    pub outages: Duration,
    pub commands: Duration,
}

impl Default for ResourceTtls {
    fn default() -> Self {
        Self {
            stats: Duration::from_secs(10),
            outages: Duration::from_secs(60),
            commands: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl From<&Config> for ResourceTtls {
    fn from(config: &Config) -> Self {
        Self {
            stats: Duration::from_millis(config.stats_ttl_ms),
            outages: Duration::from_millis(config.outages_ttl_ms),
            commands: Duration::from_millis(config.commands_ttl_ms),
        }
    }
}

// == Site Data ==
pub struct SiteData {
    api: Arc<dyn SiteApi>,
    cache: Arc<SharedFetchCache>,
    ttls: ResourceTtls,
    commands_fallback: Option<PathBuf>,
}

impl SiteData {
    pub fn new(api: Arc<dyn SiteApi>, cache: Arc<SharedFetchCache>, ttls: ResourceTtls) -> Self {
        Self {
            api,
            cache,
            ttls,
            commands_fallback: None,
        }
    }

    /// Static commands file used when neither the API nor the cache has data.
    pub fn with_commands_fallback(mut self, path: Option<PathBuf>) -> Self {
        self.commands_fallback = path;
        self
    }

    pub fn cache(&self) -> &Arc<SharedFetchCache> {
        &self.cache
    }

    // == Shards ==
    /// Shard statistics, shared across tabs for the stats TTL.
    pub async fn get_shards(&self, skip_cache: bool) -> Result<Vec<ShardData>, ApiError> {
        if skip_cache {
            return self.api.fetch_shards().await;
        }

        let result = self
            .cache
            .get_or_fetch(SHARDS_CACHE_KEY, || self.api.fetch_shards(), self.ttls.stats)
            .await;
        if let Err(err) = &result {
            warn!(error = %err, "failed to fetch or retrieve cached shard data");
        }
        result
    }

    /// Last stored shard statistics regardless of age, empty if none.
    pub fn cached_shards(&self) -> Vec<ShardData> {
        self.cache
            .cached::<Vec<ShardData>>(SHARDS_CACHE_KEY)
            .map(|entry| entry.payload)
            .unwrap_or_default()
    }

    // == Outages ==
    /// Outage list. Never fails: falls back to the stored list, then to empty.
    pub async fn get_outages(&self, skip_cache: bool) -> Vec<Outage> {
        let result = if skip_cache {
            self.api.fetch_outages().await
        } else {
            self.cache
                .get_or_fetch(
                    OUTAGES_CACHE_KEY,
                    || self.api.fetch_outages(),
                    self.ttls.outages,
                )
                .await
        };

        result.unwrap_or_else(|err| {
            warn!(error = %err, "failed to fetch outages, serving cached list");
            self.cached_outages()
        })
    }

    /// Last stored outage list regardless of age, empty if none.
    pub fn cached_outages(&self) -> Vec<Outage> {
        self.cache
            .cached::<Vec<Outage>>(OUTAGES_CACHE_KEY)
            .map(|entry| entry.payload)
            .unwrap_or_default()
    }

    /// Creates an outage and drops the cached outage list.
    pub async fn post_outage(&self, outage: &NewOutage, api_key: &str) -> Result<Outage, ApiError> {
        let created = self.api.create_outage(outage, api_key).await?;
        self.cache.invalidate(OUTAGES_CACHE_KEY)?;
        info!(id = %created.id, "outage posted");
        Ok(created)
    }

    /// Updates an outage and drops the cached outage list.
    pub async fn update_outage(
        &self,
        id: &str,
        update: &OutageUpdate,
        api_key: &str,
    ) -> Result<Outage, ApiError> {
        let updated = self.api.update_outage(id, update, api_key).await?;
        self.cache.invalidate(OUTAGES_CACHE_KEY)?;
        info!(id, "outage updated");
        Ok(updated)
    }

    // == Commands ==
    /// Command list, cached for the commands TTL.
    ///
    /// When the API fails the fetch degrades to the previously stored
    /// commands, then to the static commands file, then to an empty map, so
    /// this only errors on an invalid cache key.
    pub async fn fetch_commands(&self) -> Result<CommandsResponse, ApiError> {
        self.cache
            .get_or_fetch(
                COMMANDS_CACHE_KEY,
                || async {
                    match self.api.fetch_commands().await {
                        Ok(commands) => Ok(commands),
                        Err(err) => {
                            warn!(error = %err, "failed to fetch commands from API, using fallback");
                            Ok(self.commands_fallback().await)
                        }
                    }
                },
                self.ttls.commands,
            )
            .await
    }

    /// Forces the next `fetch_commands` to hit the API.
    pub fn refresh_commands(&self) -> Result<(), ApiError> {
        self.cache.invalidate(COMMANDS_CACHE_KEY)?;
        Ok(())
    }

    async fn commands_fallback(&self) -> CommandsResponse {
        if let Some(entry) = self.cache.cached::<CommandsResponse>(COMMANDS_CACHE_KEY) {
            if !entry.payload.is_empty() {
                info!("using cached commands data");
                return entry.payload;
            }
        }

        match &self.commands_fallback {
            Some(path) => load_static_commands(path).await,
            None => CommandsResponse::new(),
        }
    }

    // == Status ==
    /// Everything the status page shows, with the overall state derived from
    /// shard latency and open outages.
    pub async fn status(&self, skip_cache: bool) -> StatusResponse {
        let (mut shards, using_cached_data) = match self.get_shards(skip_cache).await {
            Ok(shards) => (shards, false),
            Err(_) => {
                let cached = self.cached_shards();
                let using_cache = !cached.is_empty();
                (cached, using_cache)
            }
        };
        shards.sort_by_key(|shard| shard.shard);

        let totals = total_stats(&shards);
        let outages = self.get_outages(skip_cache).await;

        let state = if using_cached_data || shards.is_empty() {
            StatusState::Down
        } else if outages.iter().any(Outage::is_active)
            || totals.average_latency > DEGRADED_LATENCY_MS
            || shards.iter().any(|s| s.latency > DEGRADED_LATENCY_MS)
        {
            StatusState::Degraded
        } else {
            StatusState::Operational
        };

        StatusResponse {
            state,
            using_cached_data,
            totals,
            shards,
            outages,
        }
    }
}
