use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;

use crate::models::{Cursor, DiscoveryRequest, ResultPage};

/// Errors that can occur when querying the search backend
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Remote collaborator that answers discovery queries
///
/// Responsible for distance filtering and sorting when a coordinate is given,
/// text relevance otherwise, and for issuing cursors.
#[async_trait]
pub trait SearchBackend<E>: Send + Sync {
    async fn search(&self, request: &DiscoveryRequest) -> Result<ResultPage<E>, SearchError>;
}

/// REST search backend for one feed
///
/// Issues `GET {base_url}/{path}?lat=..&lng=..&radius=..&q=..&cursor=..&pageSize=..`
/// and reads `{ "items": [...], "nextCursor": "..." }`. The Places-style
/// `results` / `next_page_token` shape is accepted as well.
pub struct HttpSearchBackend<E> {
    base_url: String,
    path: String,
    api_key: Option<String>,
    client: Client,
    _entity: PhantomData<fn() -> E>,
}

impl<E> HttpSearchBackend<E> {
    pub fn new(
        base_url: impl Into<String>,
        path: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            path: path.into(),
            api_key,
            client,
            _entity: PhantomData,
        })
    }

    /// Full request URL for `request`
    pub fn url_for(&self, request: &DiscoveryRequest) -> String {
        format!(
            "{}/{}?{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/'),
            query_string(request)
        )
    }
}

/// Encode a request as URL query parameters
///
/// Absent fields are omitted, so a Global request carries no location and a
/// first page carries no cursor.
pub fn query_string(request: &DiscoveryRequest) -> String {
    let mut params: Vec<(&str, String)> = Vec::with_capacity(6);

    if let Some(coordinate) = request.coordinate {
        params.push(("lat", coordinate.latitude.to_string()));
        params.push(("lng", coordinate.longitude.to_string()));
    }
    if let Some(radius) = request.radius_meters {
        params.push(("radius", radius.to_string()));
    }
    if !request.query_text.is_empty() {
        params.push(("q", request.query_text.clone()));
    }
    if let Some(cursor) = &request.cursor {
        params.push(("cursor", cursor.as_str().to_string()));
    }
    params.push(("pageSize", request.page_size.to_string()));

    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Decode a backend response body into a page
///
/// Items that do not match the feed schema are skipped rather than failing
/// the whole page.
pub fn parse_page<E: DeserializeOwned>(json: Value) -> Result<ResultPage<E>, SearchError> {
    let documents = ["items", "results", "documents"]
        .iter()
        .find_map(|key| json.get(*key).and_then(|d| d.as_array()))
        .ok_or_else(|| SearchError::InvalidResponse("Missing items array".into()))?;

    let items: Vec<E> = documents
        .iter()
        .filter_map(|doc| {
            let data = doc.get("data").unwrap_or(doc);
            serde_json::from_value(data.clone()).ok()
        })
        .collect();

    if items.len() < documents.len() {
        tracing::warn!(
            "Skipped {} malformed items out of {}",
            documents.len() - items.len(),
            documents.len()
        );
    }

    let next_cursor = ["nextCursor", "next_page_token", "nextPageToken"]
        .iter()
        .find_map(|key| json.get(*key).and_then(|c| c.as_str()))
        .filter(|token| !token.is_empty())
        .map(Cursor::from);

    Ok(ResultPage::new(items, next_cursor))
}

#[async_trait]
impl<E> SearchBackend<E> for HttpSearchBackend<E>
where
    E: DeserializeOwned + Send + Sync + 'static,
{
    async fn search(&self, request: &DiscoveryRequest) -> Result<ResultPage<E>, SearchError> {
        let url = self.url_for(request);
        tracing::debug!("Querying search backend: {}", url);

        let mut builder = self.client.get(&url);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-Api-Key", key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Search backend error on {}: {} - {}", self.path, status, body);
            return Err(SearchError::Backend {
                status: status.as_u16(),
                message: body,
            });
        }

        let json: Value = response.json().await?;
        let page = parse_page(json)?;

        tracing::debug!(
            "Backend returned {} items (more: {})",
            page.items.len(),
            page.next_cursor.is_some()
        );

        Ok(page)
    }
}
