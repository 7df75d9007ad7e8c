//! Backend client adapter for cellgraph.
//!
//! This crate provides the single seam between the gateway and the
//! document-search backend:
//!
//! - [`SearchBackend`]: trait over the two consumed capabilities,
//!   `search(dataset, query)` and `dataset_exists(dataset)`
//! - [`HttpBackend`]: implementation speaking the backend's HTTP API
//! - [`BackendConfig`]: endpoint and timeout configuration
//!
//! The backend client is constructed once at process start and injected
//! into every component that needs it; it is stateless across requests and
//! safe for concurrent use.
//!
//! # Example
//!
//! ```ignore
//! use cellgraph_backend::{BackendConfig, HttpBackend, SearchBackend};
//! use cellgraph_search_protocol::SearchQuery;
//!
//! let backend = HttpBackend::from_config(&BackendConfig::new("http://localhost:9200"))?;
//! let results = backend.search("ce00_abc_123_tree", &SearchQuery::sized(1)).await?;
//! ```

mod error;
mod http;

pub use error::{BackendError, Result};
pub use http::{BackendConfig, HttpBackend};

use async_trait::async_trait;
use cellgraph_search_protocol::{SearchQuery, SearchResults};

/// Connection to the document-search backend.
///
/// Implementations must be safe to share across concurrent in-flight
/// requests; the gateway holds one instance for the process lifetime.
#[async_trait]
pub trait SearchBackend: std::fmt::Debug + Send + Sync {
    /// Execute a search query against a named dataset.
    ///
    /// Returns the hit documents and aggregation buckets. A query matching
    /// nothing is a successful, empty result.
    async fn search(&self, dataset: &str, query: &SearchQuery) -> Result<SearchResults>;

    /// Check whether a named dataset exists, without fetching documents.
    async fn dataset_exists(&self, dataset: &str) -> Result<bool>;
}
