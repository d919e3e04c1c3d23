use async_trait::async_trait;
use thiserror::Error;

use super::request::{Row, TableRequest};

/// Error reported by the REST backend.
///
/// `Api` carries the backend's own message and code untranslated; callers
/// that need HTTP-style classification can inspect `status`.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("backend error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// A table-oriented data backend.
///
/// One [`TableRequest`] maps to exactly one call; there is no batching,
/// retrying, or transaction handling at this seam. Implementations return
/// the affected rows when the request asked for them and an empty vec
/// otherwise.
#[async_trait]
pub trait TableBackend: Send + Sync {
    async fn execute(&self, request: TableRequest) -> Result<Vec<Row>, BackendError>;
}
