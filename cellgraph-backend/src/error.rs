//! Backend adapter error types.
//!
//! Transport failures are kept distinct from data/shape errors so callers
//! can tell a retryable outage from a corrupt response. This layer performs
//! no retries itself.

use cellgraph_search_protocol::ResultShapeError;
use thiserror::Error;

/// Errors from the backend client adapter.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Request exceeded its timeout.
    #[error("backend request timed out: {message}")]
    Timeout { message: String },

    /// Could not reach the backend at all.
    #[error("failed to connect to search backend: {message}")]
    Connect { message: String },

    /// Other transport-level failure.
    #[error("backend transport error: {message}")]
    Transport { message: String },

    /// Backend answered with a non-success status.
    #[error("backend returned status {status} for dataset {dataset}: {body}")]
    Status {
        status: u16,
        dataset: String,
        body: String,
    },

    /// Backend answered but the body was not a valid search response.
    #[error("failed to decode backend response for dataset {dataset}: {source}")]
    Decode {
        dataset: String,
        #[source]
        source: ResultShapeError,
    },

    /// Backend answered with a body that is not JSON.
    #[error("backend response for dataset {dataset} is not JSON: {message}")]
    InvalidJson { dataset: String, message: String },
}

impl BackendError {
    /// Whether the failure is a transient transport condition that an outer
    /// retry policy may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout { .. }
                | BackendError::Connect { .. }
                | BackendError::Transport { .. }
        )
    }
}

/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, BackendError>;
