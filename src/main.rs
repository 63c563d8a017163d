//! Site Cache - data layer of the greed bot website
//!
//! Serves bot statistics, commands and outages over HTTP, backed by the
//! shared fetch cache.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use site_cache::{
    api::create_router,
    cache::{BroadcastHub, FileStore, KvStore, MemoryStore, SharedFetchCache},
    site::{ResourceTtls, SiteData},
    spawn_refresh_task,
    upstream::HttpSiteApi,
    AppState, Config,
};

/// Main entry point for the site data server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the persistent store and the broadcast channel for this tab
/// 4. Build the shared fetch cache and the upstream client
/// 5. Start the background stats refresh task
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting site cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: api={}, port={}, lock_duration={}ms, wait_timeout={}ms",
        config.api_base_url, config.server_port, config.lock_duration_ms, config.wait_timeout_ms
    );

    let store: Arc<dyn KvStore> = match &config.store_dir {
        Some(dir) => {
            let store = FileStore::open(dir)
                .with_context(|| format!("failed to open store at {}", dir.display()))?;
            info!("Using file store at {}", dir.display());
            Arc::new(store)
        }
        None => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let hub = BroadcastHub::new();
    let cache = Arc::new(
        SharedFetchCache::new(store, hub.open(&config.channel_name))
            .with_settings(config.cache_settings()),
    );
    info!("Shared fetch cache initialized as tab {}", cache.tab_id());

    let api = HttpSiteApi::new(config.api_base_url.clone(), config.request_timeout())
        .context("failed to build HTTP client")?;
    let site = SiteData::new(Arc::new(api), cache, ResourceTtls::from(&config))
        .with_commands_fallback(config.commands_fallback_path.clone());
    let state = AppState::new(site);

    let refresh_handle = (config.refresh_interval > 0).then(|| {
        info!("Background stats refresh started");
        spawn_refresh_task(
            state.site.clone(),
            Duration::from_secs(config.refresh_interval),
        )
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(refresh_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the refresh task and allows graceful shutdown.
async fn shutdown_signal(refresh_handle: Option<tokio::task::JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = refresh_handle {
        handle.abort();
        warn!("Stats refresh task aborted");
    }
}
