use serde::Deserialize;
use thiserror::Error;

pub type WabaResult<T> = Result<T, WabaError>;

/// Errors surfaced by [`WabaClient`](crate::WabaClient) operations.
#[derive(Debug, Error)]
pub enum WabaError {
    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 2xx but the body did not match the expected shape.
    #[error("Failed to decode API response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl WabaError {
    /// Build an [`WabaError::Api`] from a raw error body, pulling the
    /// message out of the `{"error": {"message": ...}}` envelope when the
    /// gateway used it.
    pub(crate) fn api(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or(body);
        WabaError::Api { status, message }
    }
}
