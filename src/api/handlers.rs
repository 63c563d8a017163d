//! API Handlers
//!
//! HTTP request handlers for each site data endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};

use crate::cache::SharedFetchCache;
use crate::error::ApiError;
use crate::models::{
    CacheStatsResponse, CommandsResponse, FetchQuery, HealthResponse, InvalidateResponse,
    NewOutage, Outage, OutageUpdate, ShardData, StatusResponse,
};
use crate::site::{SiteData, COMMANDS_CACHE_KEY};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Site data layer, backed by this process's cache tab
    pub site: Arc<SiteData>,
}

impl AppState {
    pub fn new(site: SiteData) -> Self {
        Self {
            site: Arc::new(site),
        }
    }

    pub fn cache(&self) -> &Arc<SharedFetchCache> {
        self.site.cache()
    }
}

/// Extracts the admin API key from `Authorization: Bearer <key>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized)
}

/// Handler for GET /status
pub async fn status_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Json<StatusResponse> {
    Json(state.site.status(query.skip_cache).await)
}

/// Handler for GET /shards
pub async fn shards_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Result<Json<Vec<ShardData>>, ApiError> {
    let shards = state.site.get_shards(query.skip_cache).await?;
    Ok(Json(shards))
}

/// Handler for GET /commands
pub async fn commands_handler(
    State(state): State<AppState>,
) -> Result<Json<CommandsResponse>, ApiError> {
    let commands = state.site.fetch_commands().await?;
    Ok(Json(commands))
}

/// Handler for POST /commands/refresh
pub async fn refresh_commands_handler(
    State(state): State<AppState>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    state.site.refresh_commands()?;
    Ok(Json(InvalidateResponse::new(COMMANDS_CACHE_KEY)))
}

/// Handler for GET /outages
pub async fn outages_handler(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Json<Vec<Outage>> {
    Json(state.site.get_outages(query.skip_cache).await)
}

/// Handler for POST /outages
pub async fn create_outage_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(outage): Json<NewOutage>,
) -> Result<Json<Outage>, ApiError> {
    let api_key = bearer_token(&headers)?;
    let created = state.site.post_outage(&outage, api_key).await?;
    Ok(Json(created))
}

/// Handler for PATCH /outages/:id
pub async fn update_outage_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(update): Json<OutageUpdate>,
) -> Result<Json<Outage>, ApiError> {
    let api_key = bearer_token(&headers)?;
    let updated = state.site.update_outage(&id, &update, api_key).await?;
    Ok(Json(updated))
}

/// Handler for DELETE /cache/:key
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    state.cache().invalidate(&key)?;
    Ok(Json(InvalidateResponse::new(key)))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let cache = state.cache();
    Json(CacheStatsResponse::new(cache.tab_id(), cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extracted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert_eq!(bearer_token(&headers).unwrap(), "secret");
    }

    #[test]
    fn test_bearer_token_missing() {
        let headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn test_bearer_token_wrong_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(ApiError::Unauthorized)));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert!(matches!(bearer_token(&headers), Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
