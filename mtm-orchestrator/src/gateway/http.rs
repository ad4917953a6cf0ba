//! HTTP client for the album processing service
//!
//! Speaks the service's JSON API under a configurable base URL
//! (`http://127.0.0.1:8000/api/v1` by default).

use super::{
    Connectivity, GatewayError, OrganizeAck, OrganizeRequest, ProcessingGateway, ResolveRequest,
    ScanRequest, SearchRequest, ServiceHealth, ShutdownAck,
};
use async_trait::async_trait;
use mtm_common::{Album, CandidateRelease};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Album processing service client
pub struct HttpGateway {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        tracing::debug!(url = %url, "POST to processing service");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn get_json<T>(&self, endpoint: &str) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        tracing::debug!(url = %url, "GET from processing service");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode<T>(response: reqwest::Response) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ProcessingGateway for HttpGateway {
    async fn scan(&self, request: &ScanRequest) -> Result<Vec<Album>, GatewayError> {
        self.post_json("scan", request).await
    }

    async fn identify(&self, albums: &[Album]) -> Result<Vec<Album>, GatewayError> {
        self.post_json("identify", albums).await
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<CandidateRelease>, GatewayError> {
        self.post_json("identify/search", request).await
    }

    async fn resolve(&self, album: &Album, release_id: &str) -> Result<Album, GatewayError> {
        let request = ResolveRequest {
            album: album.clone(),
            mb_release_id: release_id.to_string(),
        };
        self.post_json("identify/resolve", &request).await
    }

    async fn tag(&self, albums: &[Album]) -> Result<Vec<Album>, GatewayError> {
        self.post_json("tag", albums).await
    }

    async fn organize(&self, request: &OrganizeRequest) -> Result<OrganizeAck, GatewayError> {
        self.post_json("organize", request).await
    }

    async fn health(&self) -> Result<ServiceHealth, GatewayError> {
        self.get_json("health").await
    }

    async fn metadata_connectivity(&self) -> Result<Connectivity, GatewayError> {
        self.get_json("connectivity/musicbrainz").await
    }

    async fn shutdown(&self) -> Result<ShutdownAck, GatewayError> {
        self.post_json("system/shutdown", &serde_json::json!({})).await
    }
}
