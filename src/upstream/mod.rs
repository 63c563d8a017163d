//! Upstream Module
//!
//! Client for the bot's public HTTP API.
//!
//! # Endpoints
//! - `GET /status` - Shard statistics
//! - `GET /raw` - Commands grouped by category
//! - `GET /outages` - Outage list
//! - `POST /outages` - Create an outage (bearer token)
//! - `PATCH /outages/{id}` - Update an outage (bearer token)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::error::ApiError;
use crate::models::{
    CommandsResponse, NewOutage, Outage, OutageUpdate, ShardData, ShardsResponse,
};

/// Data sources the site reads from and writes to.
#[async_trait]
pub trait SiteApi: Send + Sync {
    async fn fetch_shards(&self) -> Result<Vec<ShardData>, ApiError>;

    async fn fetch_commands(&self) -> Result<CommandsResponse, ApiError>;

    async fn fetch_outages(&self) -> Result<Vec<Outage>, ApiError>;

    async fn create_outage(&self, outage: &NewOutage, api_key: &str) -> Result<Outage, ApiError>;

    async fn update_outage(
        &self,
        id: &str,
        update: &OutageUpdate,
        api_key: &str,
    ) -> Result<Outage, ApiError>;
}

// == HTTP Client ==
/// `SiteApi` over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpSiteApi {
    client: Client,
    base_url: String,
}

impl HttpSiteApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let result = async {
            let response = check_status(request.send().await?)?;
            Ok::<T, ApiError>(response.json::<T>().await?)
        }
        .await;

        if let Err(err) = &result {
            error!(error = %err, "failed to {}", what);
        }
        result
    }
}

fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(ApiError::Upstream(status.as_u16()))
    }
}

#[async_trait]
impl SiteApi for HttpSiteApi {
    async fn fetch_shards(&self) -> Result<Vec<ShardData>, ApiError> {
        debug!("fetching shard data");
        let body: ShardsResponse = self
            .send_json("fetch shard data", self.client.get(self.url("/status")))
            .await?;
        Ok(body.shards)
    }

    async fn fetch_commands(&self) -> Result<CommandsResponse, ApiError> {
        debug!("fetching commands");
        self.send_json("fetch commands", self.client.get(self.url("/raw")))
            .await
    }

    async fn fetch_outages(&self) -> Result<Vec<Outage>, ApiError> {
        debug!("fetching outages");
        self.send_json("fetch outage data", self.client.get(self.url("/outages")))
            .await
    }

    async fn create_outage(&self, outage: &NewOutage, api_key: &str) -> Result<Outage, ApiError> {
        let request = self
            .client
            .post(self.url("/outages"))
            .bearer_auth(api_key)
            .json(outage);
        self.send_json("post outage", request).await
    }

    async fn update_outage(
        &self,
        id: &str,
        update: &OutageUpdate,
        api_key: &str,
    ) -> Result<Outage, ApiError> {
        let request = self
            .client
            .patch(self.url(&format!("/outages/{}", id)))
            .bearer_auth(api_key)
            .json(update);
        self.send_json("update outage", request).await
    }
}
