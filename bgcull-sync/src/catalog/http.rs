//! HTTP transport for the catalog XML API

use super::{CatalogError, CatalogQuery, CatalogTransport};
use async_trait::async_trait;
use bgcull_common::collection::ItemId;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://boardgamegeek.com/xmlapi2";
const USER_AGENT: &str = concat!("bgcull/", env!("CARGO_PKG_VERSION"));

/// Catalog transport over reqwest
pub struct HttpCatalog {
    http_client: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpCatalog {
    pub fn new(
        base_url: Option<String>,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            auth_token,
        })
    }

    /// Request URL for a batch
    pub fn url_for(&self, ids: &[ItemId], query: CatalogQuery) -> String {
        let id_list = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        match query {
            CatalogQuery::Expansions => format!("{}/thing?id={}", self.base_url, id_list),
            CatalogQuery::Dimensions => format!("{}/thing?id={}&versions=1", self.base_url, id_list),
        }
    }
}

/// Map a response status onto the error taxonomy (`None` means success)
pub fn classify_status(status: StatusCode) -> Option<CatalogError> {
    match status {
        StatusCode::OK => None,
        StatusCode::ACCEPTED | StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            Some(CatalogError::TransientUnavailable(status.as_u16()))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(CatalogError::AuthorizationDenied(status.as_u16()))
        }
        s if s.is_success() => None,
        s => Some(CatalogError::Http(s.as_u16())),
    }
}

#[async_trait]
impl CatalogTransport for HttpCatalog {
    async fn fetch(&self, ids: &[ItemId], query: CatalogQuery) -> Result<String, CatalogError> {
        let url = self.url_for(ids, query);
        debug!(url = %url, count = ids.len(), "Querying catalog");

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))
    }
}
