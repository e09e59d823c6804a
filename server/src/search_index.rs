//! HTTP client for the external search indexer.
//!
//! The indexer exposes one resource per record:
//!
//! - `POST   {base}/api/v1/indexer/{kind}/{exhibit_id}/{record_id}` indexes it
//! - `DELETE {base}/api/v1/indexer/{record_id}` removes it (404 counts as removed)
//! - `GET    {base}/api/v1/indexer/{record_id}` answers 200 when indexed, 404 when not
//!
//! Every request carries the `x-api-key` header.

use crate::config::SearchIndexConfig;
use exhibits_core::record::{ExhibitId, RecordId, RecordKind};
use exhibits_core::search_index::{IndexFuture, SearchIndex, SearchIndexError};
use exhibits_runtime::metrics::SearchIndexMetrics;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::time::{Duration, Instant};

const API_KEY_HEADER: &str = "x-api-key";

/// [`SearchIndex`] backed by the indexer's HTTP API.
#[derive(Clone, Debug)]
pub struct HttpSearchIndex {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpSearchIndex {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &SearchIndexConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api/v1/indexer/{path}", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response, SearchIndexError> {
        let start = Instant::now();
        let result = request.send().await.map_err(transport_error);
        let success = result
            .as_ref()
            .is_ok_and(|response| response.status().is_success() || response.status() == StatusCode::NOT_FOUND);
        SearchIndexMetrics::record_request(operation, success, start.elapsed());

        if let Err(error) = &result {
            tracing::warn!(operation, error = %error, "Search index request failed");
        }
        result
    }
}

impl SearchIndex for HttpSearchIndex {
    fn index_record(&self, kind: RecordKind, exhibit_id: ExhibitId, record_id: RecordId) -> IndexFuture<'_, ()> {
        Box::pin(async move {
            let path = format!("{}/{}/{}", kind.as_str(), exhibit_id.as_str(), record_id.as_str());
            let response = self.send("index", self.request(Method::POST, &path)).await?;
            if response.status().is_success() {
                tracing::debug!(uuid = %record_id, kind = kind.as_str(), "Record indexed");
                Ok(())
            } else {
                Err(rejected(response).await)
            }
        })
    }

    fn delete_record(&self, record_id: RecordId) -> IndexFuture<'_, ()> {
        Box::pin(async move {
            let response = self
                .send("delete", self.request(Method::DELETE, record_id.as_str()))
                .await?;
            match response.status() {
                status if status.is_success() => Ok(()),
                StatusCode::NOT_FOUND => {
                    tracing::debug!(uuid = %record_id, "Record was not indexed");
                    Ok(())
                }
                _ => Err(rejected(response).await),
            }
        })
    }

    fn contains(&self, record_id: RecordId) -> IndexFuture<'_, bool> {
        Box::pin(async move {
            let response = self
                .send("contains", self.request(Method::GET, record_id.as_str()))
                .await?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(false),
                status if status.is_success() => Ok(true),
                _ => Err(rejected(response).await),
            }
        })
    }
}

fn transport_error(error: reqwest::Error) -> SearchIndexError {
    if error.is_timeout() {
        SearchIndexError::Timeout
    } else {
        SearchIndexError::Unavailable(error.to_string())
    }
}

async fn rejected(response: Response) -> SearchIndexError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    tracing::warn!(status, message = %message, "Search index rejected request");
    SearchIndexError::Rejected { status, message }
}
