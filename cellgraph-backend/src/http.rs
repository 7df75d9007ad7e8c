//! HTTP implementation of [`SearchBackend`].
//!
//! Speaks the document store's HTTP API: `POST /{dataset}/_search` with the
//! query body as JSON, and `HEAD /{dataset}` for existence checks.

use async_trait::async_trait;
use cellgraph_search_protocol::{SearchQuery, SearchResults};
use reqwest::{Client, StatusCode};
use std::fmt;
use std::time::Duration;

use crate::error::{BackendError, Result};
use crate::SearchBackend;

/// Backend connection configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the search backend (e.g., "http://localhost:9200").
    pub endpoint: String,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl BackendConfig {
    /// Configuration with default timeouts.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: 30_000,
        }
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = ms;
        self
    }
}

/// HTTP client for the document-search backend.
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    /// Build a client from configuration.
    pub fn from_config(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| BackendError::Transport {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Client with default timeouts.
    pub fn new(endpoint: impl Into<String>) -> Self {
        // Building with default options cannot fail.
        Self::from_config(&BackendConfig::new(endpoint)).unwrap()
    }

    fn transport_error(e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout {
                message: e.to_string(),
            }
        } else if e.is_connect() {
            BackendError::Connect {
                message: e.to_string(),
            }
        } else {
            BackendError::Transport {
                message: e.to_string(),
            }
        }
    }
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, dataset: &str, query: &SearchQuery) -> Result<SearchResults> {
        let url = format!("{}/{}/_search", self.endpoint, dataset);

        tracing::debug!(dataset, size = query.size(), "backend search");

        let response = self
            .client
            .post(&url)
            .json(query)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                dataset: dataset.to_string(),
                body,
            });
        }

        let body: serde_json::Value =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidJson {
                    dataset: dataset.to_string(),
                    message: e.to_string(),
                })?;

        SearchResults::from_response_body(body).map_err(|e| BackendError::Decode {
            dataset: dataset.to_string(),
            source: e,
        })
    }

    async fn dataset_exists(&self, dataset: &str) -> Result<bool> {
        let url = format!("{}/{}", self.endpoint, dataset);

        let response = self
            .client
            .head(&url)
            .send()
            .await
            .map_err(Self::transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(BackendError::Status {
                status: status.as_u16(),
                dataset: dataset.to_string(),
                body: String::new(),
            }),
        }
    }
}
