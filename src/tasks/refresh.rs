//! Stats Refresh Task
//!
//! Background task that keeps the shared shard statistics warm, the way the
//! status page polls them.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::site::SiteData;

/// Spawns a task that refreshes shard statistics through the shared cache
/// every `interval`.
///
/// Because the refresh goes through `get_or_fetch`, only one tab of the
/// origin actually hits the API per stats TTL.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_refresh_task(site: Arc<SiteData>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting stats refresh task with interval of {} ms",
            interval.as_millis()
        );

        loop {
            tokio::time::sleep(interval).await;

            match site.get_shards(false).await {
                Ok(shards) => debug!(shards = shards.len(), "stats refresh complete"),
                Err(err) => warn!(error = %err, "stats refresh failed"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BroadcastHub, MemoryStore, SharedFetchCache};
    use crate::error::ApiError;
    use crate::models::{CommandsResponse, NewOutage, Outage, OutageUpdate, ShardData};
    use crate::site::{ResourceTtls, SHARDS_CACHE_KEY};
    use crate::upstream::SiteApi;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SiteApi for CountingApi {
        async fn fetch_shards(&self) -> Result<Vec<ShardData>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![ShardData {
                uptime: 1.0,
                latency: 20.0,
                servers: 3,
                users: 30,
                shard: 0,
            }])
        }

        async fn fetch_commands(&self) -> Result<CommandsResponse, ApiError> {
            Ok(CommandsResponse::new())
        }

        async fn fetch_outages(&self) -> Result<Vec<Outage>, ApiError> {
            Ok(Vec::new())
        }

        async fn create_outage(&self, _: &NewOutage, _: &str) -> Result<Outage, ApiError> {
            Err(ApiError::Upstream(501))
        }

        async fn update_outage(
            &self,
            _: &str,
            _: &OutageUpdate,
            _: &str,
        ) -> Result<Outage, ApiError> {
            Err(ApiError::Upstream(501))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_task_warms_cache() {
        let api = Arc::new(CountingApi {
            calls: AtomicUsize::new(0),
        });
        let hub = BroadcastHub::new();
        let cache = Arc::new(SharedFetchCache::new(
            Arc::new(MemoryStore::new()),
            hub.open("refresh"),
        ));
        let site = Arc::new(SiteData::new(api.clone(), cache.clone(), ResourceTtls::default()));

        let handle = spawn_refresh_task(site, Duration::from_secs(10));
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert!(cache.cached::<Vec<ShardData>>(SHARDS_CACHE_KEY).is_some());

        handle.abort();
    }

    #[tokio::test]
    async fn test_refresh_task_can_be_aborted() {
        let api = Arc::new(CountingApi {
            calls: AtomicUsize::new(0),
        });
        let hub = BroadcastHub::new();
        let cache = Arc::new(SharedFetchCache::new(
            Arc::new(MemoryStore::new()),
            hub.open("refresh"),
        ));
        let site = Arc::new(SiteData::new(api, cache, ResourceTtls::default()));

        let handle = spawn_refresh_task(site, Duration::from_secs(1));
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
