//! Gateway error types.
//!
//! Three outcomes are kept apart by construction:
//!
//! - **Not-found** from single-result lookups is `Ok(None)`, never an error.
//! - **Data-integrity** errors (dangling child reference, bin with no state
//!   bucket) are fatal to the enclosing request and carry enough context to
//!   diagnose which entity and reference broke.
//! - **Backend** errors wrap the adapter's transport/status taxonomy without
//!   flattening it, so callers can still ask [`GatewayError::is_retryable`].

use cellgraph_backend::BackendError;
use cellgraph_search_protocol::ResultShapeError;
use thiserror::Error;

/// Errors from gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A child reference resolved to zero documents.
    #[error("dangling node reference {reference} in dataset {dataset}")]
    DanglingReference { dataset: String, reference: String },

    /// A histogram bin carried no state bucket during segment
    /// reconstruction.
    #[error("bin at key {key} in chromosome {chromosome} has no state bucket")]
    MissingBinState { chromosome: String, key: i64 },

    /// A backend document is missing a required field or has the wrong type
    /// for the declared mapping.
    #[error("malformed {entity} document in dataset {dataset}: {message}")]
    MalformedDocument {
        entity: &'static str,
        dataset: String,
        message: String,
    },

    /// The aggregation tree did not match the query that produced it.
    #[error("unexpected aggregation shape: {0}")]
    ResultShape(#[from] ResultShapeError),

    /// Failure in the backend adapter.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl GatewayError {
    /// True only for transient backend transport failures.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GatewayError::Backend(e) if e.is_retryable())
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
