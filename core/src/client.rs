use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::facets::FacetSummary;
use crate::model::{Listing, ListingKind, ResultPage};

/// The one failure kind of the front end: the listings API could not give us
/// a usable answer. Callers log it and keep whatever they showed before.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("listings API returned HTTP {0}")]
    Status(u16),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response has no data object")]
    MissingData,
}

/// Where listing pages come from.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetch one page for an already-serialized listing query.
    async fn fetch_page(&self, kind: ListingKind, query: &str) -> Result<ResultPage, FetchError>;
}

/// HTTP client for the external listings API.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("listing-front/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(ApiClient { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}{}?{}", self.base_url, path, query)
        }
    }

    async fn get_json(&self, path: &str, query: &str) -> Result<Value, FetchError> {
        let url = self.url(path, query);
        tracing::debug!(%url, "listings api request");
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Single listing for a detail page. `Ok(None)` when the API does not
    /// know the id.
    pub async fn fetch_detail(&self, kind: ListingKind, id: &str) -> Result<Option<Listing>, FetchError> {
        let Some(path) = kind.detail_api_path(id) else {
            return Ok(None);
        };
        let body = match self.get_json(&path, "").await {
            Ok(body) => body,
            Err(FetchError::Status(code)) if code == StatusCode::NOT_FOUND.as_u16() => return Ok(None),
            Err(e) => return Err(e),
        };
        match body.get("data") {
            Some(data) if data.is_object() => Ok(Some(kind.decode_item(data.clone())?)),
            _ => Ok(None),
        }
    }

    /// Facets over every property, shown on the home page.
    pub async fn fetch_home_facets(&self) -> Result<FacetSummary, FetchError> {
        let body = self.get_json("/properties/facets", "").await?;
        let data = body.get("data").ok_or(FetchError::MissingData)?;
        Ok(FacetSummary::from_wire(data.get("facets").unwrap_or(data)))
    }
}

#[async_trait]
impl ListingSource for ApiClient {
    async fn fetch_page(&self, kind: ListingKind, query: &str) -> Result<ResultPage, FetchError> {
        let body = self.get_json(kind.api_path(), query).await?;
        ResultPage::from_envelope(kind, &body)
    }
}
