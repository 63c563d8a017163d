//! API Routes
//!
//! Configures the Axum router with all site data endpoints.

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_stats_handler, commands_handler, create_outage_handler, health_handler,
    invalidate_handler, outages_handler, refresh_commands_handler, shards_handler,
    status_handler, update_outage_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `GET /status` - Status page summary
/// - `GET /shards` - Shard statistics
/// - `GET /commands` - Command list
/// - `POST /commands/refresh` - Drop the cached command list
/// - `GET /outages` - Outage list
/// - `POST /outages` - Create an outage (bearer token)
/// - `PATCH /outages/:id` - Update an outage (bearer token)
/// - `DELETE /cache/:key` - Invalidate a cache key
/// - `GET /cache/stats` - Cache statistics of this tab
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/shards", get(shards_handler))
        .route("/commands", get(commands_handler))
        .route("/commands/refresh", post(refresh_commands_handler))
        .route("/outages", get(outages_handler).post(create_outage_handler))
        .route("/outages/:id", patch(update_outage_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache/:key", delete(invalidate_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
