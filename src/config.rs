//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CacheSettings;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Base URL of the bot API
    pub api_base_url: String,
    /// Timeout applied to every upstream request, in milliseconds
    pub request_timeout_ms: u64,
    /// Refresh lease duration in milliseconds
    pub lock_duration_ms: u64,
    /// Cross-tab wait timeout in milliseconds
    pub wait_timeout_ms: u64,
    /// Freshness window of shard statistics in milliseconds
    pub stats_ttl_ms: u64,
    /// Freshness window of the outage list in milliseconds
    pub outages_ttl_ms: u64,
    /// Freshness window of the command list in milliseconds
    pub commands_ttl_ms: u64,
    /// Directory of the file-backed store; in-memory store when unset
    pub store_dir: Option<PathBuf>,
    /// Name of the cross-tab broadcast channel
    pub channel_name: String,
    /// Background stats refresh interval in seconds, 0 disables it
    pub refresh_interval: u64,
    /// Static commands JSON used when the API and the cache both fail
    pub commands_fallback_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `API_BASE_URL` - Bot API base URL (default: https://api.greed.rocks)
    /// - `REQUEST_TIMEOUT_MS` - Upstream request timeout (default: 5000)
    /// - `LOCK_DURATION_MS` - Refresh lease duration (default: 10000)
    /// - `WAIT_TIMEOUT_MS` - Cross-tab wait timeout (default: lock duration)
    /// - `STATS_TTL_MS` - Shard statistics TTL (default: 10000)
    /// - `OUTAGES_TTL_MS` - Outage list TTL (default: 60000)
    /// - `COMMANDS_TTL_MS` - Command list TTL (default: 24 hours)
    /// - `STORE_DIR` - File store directory (default: in-memory)
    /// - `CHANNEL_NAME` - Broadcast channel name (default: greed_cache_channel)
    /// - `REFRESH_INTERVAL` - Stats refresh period in seconds (default: 10)
    /// - `COMMANDS_FALLBACK_PATH` - Static commands file (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let lock_duration_ms = parse_var("LOCK_DURATION_MS", defaults.lock_duration_ms);

        Self {
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            api_base_url: env::var("API_BASE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            request_timeout_ms: parse_var("REQUEST_TIMEOUT_MS", defaults.request_timeout_ms),
            lock_duration_ms,
            wait_timeout_ms: parse_var("WAIT_TIMEOUT_MS", lock_duration_ms),
            stats_ttl_ms: parse_var("STATS_TTL_MS", defaults.stats_ttl_ms),
            outages_ttl_ms: parse_var("OUTAGES_TTL_MS", defaults.outages_ttl_ms),
            commands_ttl_ms: parse_var("COMMANDS_TTL_MS", defaults.commands_ttl_ms),
            store_dir: path_var("STORE_DIR"),
            channel_name: env::var("CHANNEL_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.channel_name),
            refresh_interval: parse_var("REFRESH_INTERVAL", defaults.refresh_interval),
            commands_fallback_path: path_var("COMMANDS_FALLBACK_PATH"),
        }
    }

    /// Coordinator timing derived from this configuration.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            lease_duration: Duration::from_millis(self.lock_duration_ms),
            wait_timeout: Duration::from_millis(self.wait_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            api_base_url: "https://api.greed.rocks".to_string(),
            request_timeout_ms: 5_000,
            lock_duration_ms: 10_000,
            wait_timeout_ms: 10_000,
            stats_ttl_ms: 10_000,
            outages_ttl_ms: 60_000,
            commands_ttl_ms: 24 * 60 * 60 * 1000,
            store_dir: None,
            channel_name: "greed_cache_channel".to_string(),
            refresh_interval: 10,
            commands_fallback_path: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
